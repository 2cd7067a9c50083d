//! Request-scoped authorization state.

use arbiter_security::Subject;
use policy_sdk::AuthorizationResult;

/// State of one request (or one unit of work) as seen by the gateway.
///
/// Holds the acting subject, the action to use when a call names none, and
/// whether any authorization check ran. Create one per request and pass it
/// `&mut` into every gateway call.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationContext {
    subject: Option<Subject>,
    default_action: Option<String>,
    authorizing: bool,
    authorization: Option<AuthorizationResult>,
}

impl AuthorizationContext {
    /// Context for `subject`; `None` is an anonymous request.
    #[must_use]
    pub fn new(subject: Option<Subject>) -> Self {
        Self {
            subject,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Action used by `authorize` calls that do not name one, typically the
    /// operation or route name.
    #[must_use]
    pub fn with_default_action(mut self, action: impl Into<String>) -> Self {
        self.default_action = Some(action.into());
        self
    }

    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn default_action(&self) -> Option<&str> {
        self.default_action.as_deref()
    }

    /// Whether an authorization check was attempted in this context.
    #[must_use]
    pub fn is_authorizing(&self) -> bool {
        self.authorizing
    }

    /// Result of the most recent completed check.
    #[must_use]
    pub fn authorization(&self) -> Option<&AuthorizationResult> {
        self.authorization.as_ref()
    }

    pub(crate) fn mark_authorizing(&mut self) {
        self.authorizing = true;
    }

    pub(crate) fn record(&mut self, authorization: AuthorizationResult) {
        self.authorization = Some(authorization);
    }
}

//! The record of a single authorization attempt.

use serde::Serialize;

use crate::Subject;
use crate::outcome::Outcome;

/// Result of one authorization attempt.
///
/// Created when `Policy::authorize` starts, settled before it returns and not
/// written to afterwards. `granted` is tri-state: `None` while the attempt is
/// in flight, then `Some(true)` or `Some(false)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationResult {
    /// Name of the policy definition that produced this result.
    policy: String,
    /// Subject the check ran for (`None` for anonymous).
    subject: Option<Subject>,
    /// Display label of the resource.
    resource: String,
    /// Action name being checked.
    action: String,
    /// Tri-state grant flag.
    pub granted: Option<bool>,
    /// Raw value returned by the action handler.
    pub result: Option<Outcome>,
    /// Human-readable denial reasons. Empty on grant.
    pub messages: Vec<String>,
    /// Caller-defined annotations. The engine never writes here.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizationResult {
    #[must_use]
    pub fn new(
        policy: impl Into<String>,
        subject: Option<Subject>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            policy: policy.into(),
            subject,
            resource: resource.into(),
            action: action.into(),
            granted: None,
            result: None,
            messages: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &str {
        &self.policy
    }

    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.granted == Some(true)
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.granted == Some(false)
    }

    /// Neither granted nor denied yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.granted.is_none()
    }
}

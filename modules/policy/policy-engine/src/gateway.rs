//! Authorization gateway: the entry point the request layer calls.
//!
//! [`AuthorizationGateway`] resolves the policy for a resource, runs the
//! requested action and turns a denied result into [`Error::Denied`]:
//! resolve policy → pick action → authorize → record in context → grant or deny.

use std::sync::Arc;

use arbiter_security::Subject;
use policy_sdk::{
    ANONYMOUS_SUBJECT, AuthorizationDenied, AuthorizationMissing, DEFAULT_SCOPE_ACTION, Error,
    Outcome, PolicyDefinition, Resource,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::context::AuthorizationContext;
use crate::registry::PolicyRegistry;

/// Per-call overrides for gateway checks.
///
/// All fields default to "not overridden".
///
/// ```ignore
/// gateway.authorize_with(
///     &mut ctx,
///     &post,
///     &AuthorizeRequest::new()
///         .action("transfer")
///         .arg(json!("bob")),
/// )?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRequest {
    action: Option<String>,
    policy: Option<Arc<PolicyDefinition>>,
    args: Vec<Value>,
}

impl AuthorizeRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Action to check instead of the context default.
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Policy to use instead of the one resolved for the resource.
    #[must_use]
    pub fn policy(mut self, policy: Arc<PolicyDefinition>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Append one positional argument for the handler. Arrays stay one argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Replace all positional arguments.
    #[must_use]
    pub fn args(mut self, values: Vec<Value>) -> Self {
        self.args = values;
        self
    }

    #[must_use]
    pub fn action_name(&self) -> Option<&str> {
        self.action.as_deref()
    }

    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.args
    }
}

/// Policy enforcement entry point.
///
/// Cheap to clone (`Arc` inside). Request state is kept in the
/// [`AuthorizationContext`] passed to each call.
///
/// ```ignore
/// let gateway = AuthorizationGateway::new(Arc::new(PolicyRegistry::with_declared()));
/// let mut ctx = AuthorizationContext::new(Some(subject)).with_default_action("update");
///
/// gateway.authorize(&mut ctx, &post)?;
/// gateway.verify_authorized(&ctx)?;
/// ```
#[derive(Debug, Clone)]
pub struct AuthorizationGateway {
    registry: Arc<PolicyRegistry>,
    default_scope_action: Option<String>,
}

impl AuthorizationGateway {
    #[must_use]
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self {
            registry,
            default_scope_action: None,
        }
    }

    /// Apply gateway settings from configuration.
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.default_scope_action = Some(config.default_scope_action.clone());
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    /// Authorize the context default action on `resource`.
    ///
    /// Returns the handler's raw outcome on grant.
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizationGateway::authorize_with`].
    pub fn authorize(
        &self,
        ctx: &mut AuthorizationContext,
        resource: &dyn Resource,
    ) -> Result<Outcome, Error> {
        self.authorize_with(ctx, resource, &AuthorizeRequest::default())
    }

    /// Authorize `resource` with per-call overrides.
    ///
    /// The context is marked as authorizing before anything can fail, so a
    /// failed check still satisfies [`AuthorizationGateway::verify_authorized`].
    ///
    /// # Errors
    ///
    /// - [`Error::Resolution`] if no policy applies to the resource
    /// - [`Error::ActionUnspecified`] if neither the request nor the context names an action
    /// - [`Error::NoSuchAction`] if the policy has no handler for the action
    /// - [`Error::Denied`] if the check was denied
    /// - [`Error::Handler`] if the handler failed
    #[tracing::instrument(
        skip_all,
        fields(
            resource = %resource,
            subject = ctx.subject().map_or(ANONYMOUS_SUBJECT, Subject::id),
        )
    )]
    pub fn authorize_with(
        &self,
        ctx: &mut AuthorizationContext,
        resource: &dyn Resource,
        request: &AuthorizeRequest,
    ) -> Result<Outcome, Error> {
        ctx.mark_authorizing();
        let definition = self.policy_for(resource, request)?;

        let Some(action) = request
            .action_name()
            .or_else(|| ctx.default_action())
            .map(str::to_owned)
        else {
            return Err(Error::ActionUnspecified {
                policy: definition.name().to_owned(),
            });
        };

        Self::enforce(ctx, &definition, &action, resource, request.arguments())
    }

    /// Like [`AuthorizationGateway::authorize_with`], but a denial is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Every error of [`AuthorizationGateway::authorize_with`] except
    /// [`Error::Denied`].
    pub fn authorized(
        &self,
        ctx: &mut AuthorizationContext,
        resource: &dyn Resource,
        request: &AuthorizeRequest,
    ) -> Result<Option<Outcome>, Error> {
        match self.authorize_with(ctx, resource, request) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(Error::Denied(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Boolean form of [`AuthorizationGateway::authorized`].
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizationGateway::authorized`].
    pub fn is_authorized(
        &self,
        ctx: &mut AuthorizationContext,
        resource: &dyn Resource,
        request: &AuthorizeRequest,
    ) -> Result<bool, Error> {
        self.authorized(ctx, resource, request)
            .map(|outcome| outcome.is_some())
    }

    /// Authorize a collection or query object.
    ///
    /// The action is the request action, else the policy's own scope action,
    /// else the configured default, else `index`. The context default action
    /// is not used.
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizationGateway::authorize_with`], except
    /// [`Error::ActionUnspecified`] cannot occur.
    #[tracing::instrument(skip_all, fields(scope = %scope))]
    pub fn authorize_scope(
        &self,
        ctx: &mut AuthorizationContext,
        scope: &dyn Resource,
        request: &AuthorizeRequest,
    ) -> Result<Outcome, Error> {
        ctx.mark_authorizing();
        let definition = self.policy_for(scope, request)?;
        let action = request
            .action_name()
            .unwrap_or_else(|| self.scope_action(&definition))
            .to_owned();

        Self::enforce(ctx, &definition, &action, scope, request.arguments())
    }

    /// Fail unless an authorization check ran in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Missing`] if no `authorize*` call was made.
    #[allow(clippy::unused_self)] // Keep the check on the gateway next to the calls it verifies
    pub fn verify_authorized(&self, ctx: &AuthorizationContext) -> Result<(), Error> {
        if ctx.is_authorizing() {
            return Ok(());
        }
        warn!(
            subject = ctx.subject().map_or(ANONYMOUS_SUBJECT, Subject::id),
            "operation finished without an authorization check"
        );
        Err(AuthorizationMissing.into())
    }

    fn scope_action<'a>(&'a self, definition: &'a PolicyDefinition) -> &'a str {
        definition
            .explicit_scope_action()
            .or(self.default_scope_action.as_deref())
            .unwrap_or(DEFAULT_SCOPE_ACTION)
    }

    fn policy_for(
        &self,
        resource: &dyn Resource,
        request: &AuthorizeRequest,
    ) -> Result<Arc<PolicyDefinition>, Error> {
        match &request.policy {
            Some(policy) => Ok(Arc::clone(policy)),
            None => self.registry.resolve(resource),
        }
    }

    fn enforce(
        ctx: &mut AuthorizationContext,
        definition: &PolicyDefinition,
        action: &str,
        resource: &dyn Resource,
        args: &[Value],
    ) -> Result<Outcome, Error> {
        let authorization = definition.authorize(action, ctx.subject(), resource, args)?;

        // `Policy::authorize` always settles, so anything not denied is granted.
        if !authorization.is_denied() {
            debug!(policy = definition.name(), action, "authorization granted");
            let outcome = authorization.result.clone().unwrap_or(Outcome::Grant);
            ctx.record(authorization);
            return Ok(outcome);
        }

        info!(
            policy = definition.name(),
            action,
            messages = ?authorization.messages,
            "authorization denied"
        );
        ctx.record(authorization.clone());
        Err(AuthorizationDenied::new(authorization).into())
    }
}

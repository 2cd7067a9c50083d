//! Policy definitions and the authorize lifecycle.
//!
//! A [`PolicyDefinition`] is a policy *type*: a name, a table of action
//! handlers and per-type settings. A [`Policy`] binds a definition to one
//! (subject, resource) pair and runs a single action through it:
//! create result → call handler → capture return value → normalize.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::Subject;
use crate::authorization::AuthorizationResult;
use crate::error::{ActionError, Error};
use crate::outcome::Outcome;
use crate::resource::Resource;

/// Scope action used when a definition does not set one.
pub const DEFAULT_SCOPE_ACTION: &str = "index";

/// How an absent subject is rendered in failure messages.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Handler for a single action.
///
/// Receives the policy bound to the current (subject, resource) pair and the
/// extra positional arguments the caller passed.
pub type ActionHandler =
    Arc<dyn Fn(&mut Policy<'_>, &[Value]) -> Result<Outcome, ActionError> + Send + Sync>;

/// Builds the generic denial message for an action.
pub type FailureMessage = Arc<dyn Fn(&Policy<'_>, &str) -> String + Send + Sync>;

fn handler<F>(f: F) -> ActionHandler
where
    F: Fn(&mut Policy<'_>, &[Value]) -> Result<Outcome, ActionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A policy type: the authorization unit for one resource type.
pub struct PolicyDefinition {
    name: String,
    scope_action: Option<String>,
    actions: HashMap<String, ActionHandler>,
    failure_message: Option<FailureMessage>,
}

impl PolicyDefinition {
    /// Start building a definition named `name` (e.g. `"PostPolicy"`).
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PolicyDefinitionBuilder {
        PolicyDefinitionBuilder {
            name: name.into(),
            scope_action: None,
            actions: HashMap::new(),
            failure_message: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Action used when authorizing a collection. Defaults to `index`.
    #[must_use]
    pub fn scope_action(&self) -> &str {
        self.scope_action.as_deref().unwrap_or(DEFAULT_SCOPE_ACTION)
    }

    /// The scope action if one was set on this definition.
    #[must_use]
    pub fn explicit_scope_action(&self) -> Option<&str> {
        self.scope_action.as_deref()
    }

    #[must_use]
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Supported action names, sorted.
    #[must_use]
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run `action` for `subject` against `resource`.
    ///
    /// Constructs a [`Policy`] bound to the pair and calls
    /// [`Policy::authorize`]. This is the entry point callers should use.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchAction`] if the definition has no handler for `action`
    /// - [`Error::Handler`] if the handler fails with a business error
    pub fn authorize(
        &self,
        action: &str,
        subject: Option<&Subject>,
        resource: &dyn Resource,
        args: &[Value],
    ) -> Result<AuthorizationResult, Error> {
        Policy::new(self, subject, resource).authorize(action, args)
    }

    fn handler(&self, action: &str) -> Option<&ActionHandler> {
        self.actions.get(action)
    }
}

impl fmt::Debug for PolicyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyDefinition")
            .field("name", &self.name)
            .field("scope_action", &self.scope_action)
            .field("actions", &self.actions())
            .finish_non_exhaustive()
    }
}

pub struct PolicyDefinitionBuilder {
    name: String,
    scope_action: Option<String>,
    actions: HashMap<String, ActionHandler>,
    failure_message: Option<FailureMessage>,
}

impl PolicyDefinitionBuilder {
    /// Register the handler for `name`. A second registration replaces the first.
    #[must_use]
    pub fn action<F, O>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Policy<'_>, &[Value]) -> Result<O, ActionError> + Send + Sync + 'static,
        O: Into<Outcome>,
    {
        self.actions.insert(
            name.into(),
            handler(move |policy, args| f(policy, args).map(Into::into)),
        );
        self
    }

    /// Set the action used for collection checks.
    #[must_use]
    pub fn scope(mut self, action: impl Into<String>) -> Self {
        self.scope_action = Some(action.into());
        self
    }

    /// Override the generic denial message.
    #[must_use]
    pub fn failure_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&Policy<'_>, &str) -> String + Send + Sync + 'static,
    {
        self.failure_message = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn build(self) -> PolicyDefinition {
        PolicyDefinition {
            name: self.name,
            scope_action: self.scope_action,
            actions: self.actions,
            failure_message: self.failure_message,
        }
    }
}

/// A policy bound to one (subject, resource) pair.
pub struct Policy<'a> {
    definition: &'a PolicyDefinition,
    subject: Option<&'a Subject>,
    resource: &'a dyn Resource,
    errors: Vec<String>,
    authorization: Option<AuthorizationResult>,
}

impl<'a> Policy<'a> {
    #[must_use]
    pub fn new(
        definition: &'a PolicyDefinition,
        subject: Option<&'a Subject>,
        resource: &'a dyn Resource,
    ) -> Self {
        Self {
            definition,
            subject,
            resource,
            errors: Vec::new(),
            authorization: None,
        }
    }

    #[must_use]
    pub fn definition(&self) -> &'a PolicyDefinition {
        self.definition
    }

    #[must_use]
    pub fn subject(&self) -> Option<&'a Subject> {
        self.subject
    }

    /// Identifier of the subject, `None` when anonymous.
    #[must_use]
    pub fn subject_id(&self) -> Option<&'a str> {
        self.subject.map(Subject::id)
    }

    #[must_use]
    pub fn resource(&self) -> &'a dyn Resource {
        self.resource
    }

    /// Downcast the resource to a concrete type.
    #[must_use]
    pub fn resource_as<T: Any>(&self) -> Option<&'a T> {
        self.resource.as_any().downcast_ref::<T>()
    }

    /// Validation-style failure details collected by handlers.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut Vec<String> {
        &mut self.errors
    }

    /// The attempt currently in flight (or the last one).
    #[must_use]
    pub fn authorization(&self) -> Option<&AuthorizationResult> {
        self.authorization.as_ref()
    }

    /// Mutable access for handlers that settle the result themselves or attach
    /// metadata.
    pub fn authorization_mut(&mut self) -> Option<&mut AuthorizationResult> {
        self.authorization.as_mut()
    }

    /// Generic denial message for `action`.
    #[must_use]
    pub fn failure_message(&self, action: &str) -> String {
        if let Some(message) = &self.definition.failure_message {
            return message(self, action);
        }
        let subject = self.subject_id().unwrap_or(ANONYMOUS_SUBJECT);
        format!("{subject} is not authorized to {action} {}", self.resource)
    }

    /// Run another action of this policy on a fresh result.
    ///
    /// The attempt currently in flight is left untouched, so a handler can
    /// return the nested result as [`Outcome::Delegated`].
    ///
    /// # Errors
    ///
    /// Same as [`Policy::authorize`].
    pub fn delegate(
        &mut self,
        action: &str,
        args: &[Value],
    ) -> Result<AuthorizationResult, Error> {
        let current = self.authorization.take();
        let nested = self.authorize(action, args);
        self.authorization = current;
        nested
    }

    /// Run `action` and settle the result.
    ///
    /// A handler denial ([`ActionError::Denied`]) is caught and settled as a
    /// denied result; it does not escape.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchAction`] if the definition has no handler for `action`
    /// - [`Error::Handler`] (or the engine error it returned) if the handler fails
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(policy = %self.definition.name, action = %action)
    )]
    pub fn authorize(
        &mut self,
        action: &str,
        args: &[Value],
    ) -> Result<AuthorizationResult, Error> {
        let definition = self.definition;
        let handler = definition
            .handler(action)
            .ok_or_else(|| Error::NoSuchAction {
                policy: definition.name.clone(),
                action: action.to_owned(),
            })?;

        let fresh = AuthorizationResult::new(
            definition.name.as_str(),
            self.subject.cloned(),
            self.resource.to_string(),
            action,
        );
        self.authorization = Some(fresh.clone());

        let returned = match handler(self, args) {
            Ok(outcome) => outcome,
            Err(ActionError::Denied(_)) => {
                debug!("handler denied");
                if let Some(authorization) = self.authorization.as_mut() {
                    authorization.granted = Some(false);
                }
                Outcome::Deny
            }
            Err(ActionError::Failed(e)) => {
                return Err(match e.downcast::<Error>() {
                    Ok(engine) => engine,
                    Err(other) => Error::Handler(other),
                });
            }
        };

        let mut authorization = self.authorization.take().unwrap_or(fresh);
        if authorization.result.is_none() {
            authorization.result = Some(returned);
        }
        self.settle(&mut authorization, action);

        debug!(
            granted = authorization.is_granted(),
            messages = authorization.messages.len(),
            "authorization settled"
        );
        self.authorization = Some(authorization.clone());
        Ok(authorization)
    }

    fn settle(&self, authorization: &mut AuthorizationResult, action: &str) {
        let denial = match &authorization.result {
            Some(Outcome::Delegated(nested)) => {
                // A handler may return its own attempt; its messages are already here.
                if authorization.messages.is_empty() {
                    authorization.messages.clone_from(&nested.messages);
                }
                match nested.granted {
                    Some(true) => None,
                    Some(false) if !authorization.messages.is_empty() => {
                        authorization.granted = Some(false);
                        return;
                    }
                    // Unsettled nested results never grant.
                    _ => Some(self.failure_message(action)),
                }
            }
            Some(Outcome::Denial(reason) | Outcome::Other(Value::String(reason))) => {
                Some(reason.clone())
            }
            None | Some(Outcome::Deny | Outcome::Other(Value::Null | Value::Bool(false))) => {
                Some(self.failure_message(action))
            }
            Some(Outcome::Grant | Outcome::Other(_)) => None,
        };

        match denial {
            Some(message) => {
                authorization.granted = Some(false);
                authorization.messages.push(message);
            }
            None => authorization.granted = Some(true),
        }
    }
}

impl fmt::Debug for Policy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("definition", &self.definition.name)
            .field("subject", &self.subject_id())
            .field("resource", &self.resource.to_string())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

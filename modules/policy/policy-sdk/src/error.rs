//! Error types for the policy module.

use thiserror::Error;

use crate::authorization::AuthorizationResult;

/// Errors surfaced to callers of the policy engine.
///
/// Ordinary denials are data (a denied [`AuthorizationResult`]) inside the
/// core. Only the gateway turns them into [`Error::Denied`]. Configuration and
/// definition bugs ([`Error::Resolution`], [`Error::NoSuchAction`]) are never
/// downgraded to a denial.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No policy could be resolved for a resource.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The resolved policy has no handler for the requested action.
    #[error("policy '{policy}' has no handler for action '{action}'")]
    NoSuchAction { policy: String, action: String },

    /// Neither the request nor the context named an action.
    #[error("no action given for policy '{policy}' and the context has no default action")]
    ActionUnspecified { policy: String },

    /// A completed authorization attempt was denied.
    #[error(transparent)]
    Denied(#[from] AuthorizationDenied),

    /// `verify_authorized` ran before any authorization check.
    #[error(transparent)]
    Missing(#[from] AuthorizationMissing),

    /// An action handler failed with a business error.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// The engine configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for an ordinary access denial.
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Returns `true` for errors caused by policy definitions or engine setup.
    ///
    /// These are server faults and should never be presented as "access denied".
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Resolution(_)
                | Self::NoSuchAction { .. }
                | Self::ActionUnspecified { .. }
                | Self::Config(_)
        )
    }

    /// The denied result, if this is a denial.
    #[must_use]
    pub fn authorization(&self) -> Option<&AuthorizationResult> {
        match self {
            Self::Denied(denied) => Some(denied.authorization()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Policy resolution failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no policy '{policy}' found for resource type '{resource_type}'")]
    NotFound {
        resource_type: String,
        policy: String,
    },

    #[error("resource type '{resource_type}' is registered without a policy")]
    Disabled { resource_type: String },
}

/// A settled, denied authorization attempt.
///
/// Carries the full [`AuthorizationResult`] so callers can display its
/// messages.
#[derive(Debug, Clone, Error)]
#[error("access denied: {}", .authorization.messages.join("; "))]
pub struct AuthorizationDenied {
    authorization: Box<AuthorizationResult>,
}

impl AuthorizationDenied {
    #[must_use]
    pub fn new(authorization: AuthorizationResult) -> Self {
        Self {
            authorization: Box::new(authorization),
        }
    }

    #[must_use]
    pub fn authorization(&self) -> &AuthorizationResult {
        &self.authorization
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.authorization.messages
    }

    #[must_use]
    pub fn into_authorization(self) -> AuthorizationResult {
        *self.authorization
    }
}

/// Completeness guard failure: no authorization check happened.
#[derive(Debug, Clone, Copy, Default, Error, PartialEq, Eq)]
#[error("no authorization check was performed for this operation")]
pub struct AuthorizationMissing;

/// Error returned by an action handler.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Short-circuit to a denial. The policy catches this and settles the
    /// attempt as denied; it never escapes `Policy::authorize`.
    #[error("action denied")]
    Denied(Option<AuthorizationDenied>),

    /// Business logic failure. Propagated unchanged.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ActionError {
    /// Deny from inside a handler.
    #[must_use]
    pub fn deny() -> Self {
        Self::Denied(None)
    }
}

impl From<Error> for ActionError {
    fn from(e: Error) -> Self {
        match e {
            Error::Denied(denied) => Self::Denied(Some(denied)),
            other => Self::Failed(anyhow::Error::new(other)),
        }
    }
}

impl From<AuthorizationDenied> for ActionError {
    fn from(denied: AuthorizationDenied) -> Self {
        Self::Denied(Some(denied))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn denied_result() -> AuthorizationResult {
        let mut result = AuthorizationResult::new("PostPolicy", None, "Post#1", "update");
        result.granted = Some(false);
        result.messages.push("must own the post".to_owned());
        result.messages.push("post is locked".to_owned());
        result
    }

    #[test]
    fn denied_display_joins_messages() {
        let err = Error::from(AuthorizationDenied::new(denied_result()));

        assert_eq!(
            err.to_string(),
            "access denied: must own the post; post is locked"
        );
        assert!(err.is_denial());
        assert!(!err.is_configuration());
        assert_eq!(
            err.authorization().map(AuthorizationResult::action),
            Some("update")
        );
    }

    #[test]
    fn resolution_and_missing_action_are_configuration_errors() {
        let resolution = Error::from(ResolutionError::NotFound {
            resource_type: "Comment".to_owned(),
            policy: "CommentPolicy".to_owned(),
        });
        let no_action = Error::NoSuchAction {
            policy: "PostPolicy".to_owned(),
            action: "publish".to_owned(),
        };

        assert!(resolution.is_configuration());
        assert!(no_action.is_configuration());
        assert!(!Error::from(AuthorizationMissing).is_configuration());
        assert_eq!(
            resolution.to_string(),
            "no policy 'CommentPolicy' found for resource type 'Comment'"
        );
    }

    #[test]
    fn engine_denial_converts_to_handler_denial() {
        let action_err = ActionError::from(Error::from(AuthorizationDenied::new(denied_result())));

        assert!(matches!(action_err, ActionError::Denied(Some(_))));
    }

    #[test]
    fn other_engine_errors_convert_to_failures() {
        let action_err = ActionError::from(Error::NoSuchAction {
            policy: "PostPolicy".to_owned(),
            action: "publish".to_owned(),
        });

        match action_err {
            ActionError::Failed(e) => assert!(e.downcast_ref::<Error>().is_some()),
            other @ ActionError::Denied(_) => panic!("expected failure, got {other:?}"),
        }
    }
}

//! Values an action handler can return.

use serde::Serialize;
use serde_json::Value;

use crate::authorization::AuthorizationResult;

/// What an action handler returned.
///
/// Handlers rarely build this directly: anything that implements
/// `Into<Outcome>` may be returned, so `bool`, `&str`, `String`,
/// `Option<T>`, a nested [`AuthorizationResult`] or a `serde_json::Value`
/// all work.
///
/// Normalization (done by `Policy::authorize`):
///
/// | Variant | Settles as |
/// |---|---|
/// | `Grant` | granted |
/// | `Deny` | denied, generic failure message |
/// | `Denial(reason)` | denied, `reason` as the message |
/// | `Delegated(result)` | whatever the nested result settled as |
/// | `Other(Null)`, `Other(false)` | denied, generic failure message |
/// | `Other(String)` | denied, the string as the message |
/// | any other `Other` | granted, including empty arrays and objects |
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// `true`.
    Grant,
    /// `false` or nothing.
    Deny,
    /// Denial with an explicit reason.
    Denial(String),
    /// The handler delegated to another check and returned its result.
    Delegated(Box<AuthorizationResult>),
    /// Any other value, judged by truthiness.
    Other(Value),
}

impl Outcome {
    /// The carried value for [`Outcome::Other`].
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Other(v) => Some(v),
            _ => None,
        }
    }

    /// The nested result for [`Outcome::Delegated`].
    #[must_use]
    pub fn delegated(&self) -> Option<&AuthorizationResult> {
        match self {
            Self::Delegated(result) => Some(result),
            _ => None,
        }
    }
}

impl From<bool> for Outcome {
    #[inline]
    fn from(granted: bool) -> Self {
        if granted { Self::Grant } else { Self::Deny }
    }
}

impl From<&str> for Outcome {
    #[inline]
    fn from(reason: &str) -> Self {
        Self::Denial(reason.to_owned())
    }
}

impl From<String> for Outcome {
    #[inline]
    fn from(reason: String) -> Self {
        Self::Denial(reason)
    }
}

impl From<AuthorizationResult> for Outcome {
    #[inline]
    fn from(result: AuthorizationResult) -> Self {
        Self::Delegated(Box::new(result))
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Deny,
            Value::Bool(b) => Self::from(b),
            Value::String(s) => Self::Denial(s),
            other => Self::Other(other),
        }
    }
}

impl<T: Into<Outcome>> From<Option<T>> for Outcome {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Deny, Into::into)
    }
}

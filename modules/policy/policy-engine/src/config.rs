//! Engine configuration.

use std::collections::HashMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use policy_sdk::{DEFAULT_SCOPE_ACTION, Error};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables that override scalar settings.
pub const ENV_PREFIX: &str = "ARBITER_";

/// Default suffix appended to a resource type name to find its policy.
pub const DEFAULT_POLICY_SUFFIX: &str = "Policy";

/// Configuration for the policy registry and gateway.
///
/// ```yaml
/// policy_suffix: Policy
/// default_scope_action: index
/// bindings:
///   Draft: PostPolicy
/// disabled:
///   - HealthCheck
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Appended to the resource type name to derive the default policy name.
    pub policy_suffix: String,
    /// Scope action used when a policy does not set its own.
    pub default_scope_action: String,
    /// Resource type name → policy name overrides.
    pub bindings: HashMap<String, String>,
    /// Resource types that are explicitly registered without a policy.
    pub disabled: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy_suffix: DEFAULT_POLICY_SUFFIX.to_owned(),
            default_scope_action: DEFAULT_SCOPE_ACTION.to_owned(),
            bindings: HashMap::new(),
            disabled: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Layered configuration sources: defaults, then the YAML file, then
    /// `ARBITER_POLICY_SUFFIX` / `ARBITER_DEFAULT_SCOPE_ACTION`.
    ///
    /// Only the scalar settings are read from the environment; resource type
    /// names are case-sensitive and environment keys are not.
    #[must_use]
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).only(&["policy_suffix", "default_scope_action"]))
    }

    /// Load and validate the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file does not exist, cannot be parsed,
    /// contains unknown keys, or fails [`EngineConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let config: Self = Self::figment(path)
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty suffix, an empty default scope
    /// action, an empty binding on either side, or an empty disabled type.
    pub fn validate(&self) -> Result<(), Error> {
        if self.policy_suffix.trim().is_empty() {
            return Err(Error::Config("policy_suffix must not be empty".to_owned()));
        }
        if self.default_scope_action.trim().is_empty() {
            return Err(Error::Config(
                "default_scope_action must not be empty".to_owned(),
            ));
        }
        if let Some((resource_type, policy)) = self
            .bindings
            .iter()
            .find(|(resource_type, policy)| resource_type.is_empty() || policy.is_empty())
        {
            return Err(Error::Config(format!(
                "invalid binding '{resource_type}' -> '{policy}'"
            )));
        }
        if self.disabled.iter().any(|resource_type| resource_type.is_empty()) {
            return Err(Error::Config(
                "disabled resource types must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

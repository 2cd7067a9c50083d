//! Resource type → policy resolution.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use policy_sdk::{
    Error, PolicyDefinition, ResolutionError, Resource, declared_policies, resource_type_name,
};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_POLICY_SUFFIX, EngineConfig};

/// An explicit registry entry for a resource type.
#[derive(Debug, Clone)]
pub enum PolicyBinding {
    /// Resolve to this definition.
    Policy(Arc<PolicyDefinition>),
    /// The type is known to have no policy.
    Disabled,
}

/// Process-wide lookup from resource type name to policy definition.
///
/// Resolution order for a type name `X`:
/// 1. an explicit binding (`register`, `disable`, configured `bindings`);
/// 2. a previously resolved default, memoized for the registry's lifetime;
/// 3. the definition named `X` + suffix (`XPolicy`) in the catalog.
///
/// Shared behind an `Arc`. Concurrent callers may race on step 3; every
/// caller still ends up with the same cached `Arc`.
pub struct PolicyRegistry {
    suffix: String,
    catalog: DashMap<String, Arc<PolicyDefinition>>,
    explicit: DashMap<String, PolicyBinding>,
    resolved: DashMap<String, Arc<PolicyDefinition>>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyRegistry {
    /// Empty registry with the default `Policy` suffix.
    #[must_use]
    pub fn new() -> Self {
        Self::with_suffix(DEFAULT_POLICY_SUFFIX)
    }

    /// Empty registry deriving default policy names with `suffix`.
    #[must_use]
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            catalog: DashMap::new(),
            explicit: DashMap::new(),
            resolved: DashMap::new(),
        }
    }

    /// Registry seeded with every `declare_policy!` declaration.
    #[must_use]
    pub fn with_declared() -> Self {
        let registry = Self::new();
        registry.define_declared();
        registry
    }

    /// Build a registry from configuration.
    ///
    /// Seeds the catalog from static declarations, then applies `bindings`
    /// and `disabled`. A type listed in both ends up disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid or a binding
    /// names a policy that is not declared.
    pub fn from_config(config: &EngineConfig) -> Result<Self, Error> {
        config.validate()?;

        let registry = Self::with_suffix(config.policy_suffix.as_str());
        registry.define_declared();
        for (resource_type, policy) in &config.bindings {
            registry.bind(resource_type, policy)?;
        }
        for resource_type in &config.disabled {
            registry.disable(resource_type.as_str());
        }

        info!(
            policies = registry.catalog.len(),
            bindings = registry.explicit.len(),
            suffix = %registry.suffix,
            "policy registry ready"
        );
        Ok(registry)
    }

    /// Suffix used to derive default policy names.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Add a definition to the catalog under its own name.
    ///
    /// Replacing a definition drops any default resolution that pointed at
    /// the old one and repoints explicit bindings to the new one.
    pub fn define(&self, definition: impl Into<Arc<PolicyDefinition>>) -> Arc<PolicyDefinition> {
        let definition = definition.into();
        let name = definition.name().to_owned();
        if self
            .catalog
            .insert(name.clone(), Arc::clone(&definition))
            .is_some()
        {
            debug!(policy = %name, "policy redefined");
            self.resolved.retain(|_, cached| cached.name() != name);
            for mut entry in self.explicit.iter_mut() {
                if let PolicyBinding::Policy(bound) = entry.value_mut()
                    && bound.name() == name
                {
                    *bound = Arc::clone(&definition);
                }
            }
        }
        definition
    }

    /// Bind `resource_type` to `definition`, overriding the name-derived default.
    pub fn register(
        &self,
        resource_type: impl Into<String>,
        definition: impl Into<Arc<PolicyDefinition>>,
    ) {
        let definition = self.define(definition);
        self.insert_explicit(resource_type.into(), PolicyBinding::Policy(definition));
    }

    /// Bind `resource_type` to a policy already in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no policy named `policy` is defined.
    pub fn bind(&self, resource_type: impl Into<String>, policy: &str) -> Result<(), Error> {
        let resource_type = resource_type.into();
        let definition = self.definition(policy).ok_or_else(|| {
            Error::Config(format!(
                "binding '{resource_type}' names unknown policy '{policy}'"
            ))
        })?;
        self.insert_explicit(resource_type, PolicyBinding::Policy(definition));
        Ok(())
    }

    /// Mark `resource_type` as having no policy.
    pub fn disable(&self, resource_type: impl Into<String>) {
        self.insert_explicit(resource_type.into(), PolicyBinding::Disabled);
    }

    /// Look up a definition in the catalog by policy name.
    #[must_use]
    pub fn definition(&self, policy: &str) -> Option<Arc<PolicyDefinition>> {
        self.catalog.get(policy).map(|entry| Arc::clone(entry.value()))
    }

    /// Resolve the policy for `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if the resource type has no policy.
    pub fn resolve(&self, resource: &dyn Resource) -> Result<Arc<PolicyDefinition>, Error> {
        self.resolve_name(&resource_type_name(resource))
    }

    /// Resolve the policy for a resource type name.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::Disabled`] if the type is registered without a policy
    /// - [`ResolutionError::NotFound`] if neither a binding nor `<type><suffix>` exists
    #[tracing::instrument(level = "debug", skip_all, fields(resource_type = %resource_type))]
    pub fn resolve_name(&self, resource_type: &str) -> Result<Arc<PolicyDefinition>, Error> {
        if let Some(binding) = self.explicit.get(resource_type) {
            return match binding.value() {
                PolicyBinding::Policy(definition) => Ok(Arc::clone(definition)),
                PolicyBinding::Disabled => {
                    warn!("resource type is registered without a policy");
                    Err(ResolutionError::Disabled {
                        resource_type: resource_type.to_owned(),
                    }
                    .into())
                }
            };
        }

        if let Some(cached) = self.resolved.get(resource_type) {
            debug!(policy = %cached.name(), "policy cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        let policy = format!("{resource_type}{}", self.suffix);
        let Some(definition) = self.definition(&policy) else {
            debug!(policy = %policy, "no policy defined");
            return Err(ResolutionError::NotFound {
                resource_type: resource_type.to_owned(),
                policy,
            }
            .into());
        };

        // First writer wins so racing callers share one Arc.
        let mut cached = self
            .resolved
            .entry(resource_type.to_owned())
            .or_insert(definition);
        // A concurrent `define` may have replaced the policy after the read above.
        if let Some(current) = self.definition(&policy)
            && !Arc::ptr_eq(&current, cached.value())
        {
            *cached = current;
        }
        debug!(policy = %policy, "policy resolved");
        Ok(Arc::clone(cached.value()))
    }

    /// Whether `resource_type` resolves without consulting the catalog.
    #[must_use]
    pub fn is_cached(&self, resource_type: &str) -> bool {
        self.explicit.contains_key(resource_type) || self.resolved.contains_key(resource_type)
    }

    /// Number of resource types with an explicit or memoized binding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.explicit.len() + self.resolved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted names of all defined policies.
    #[must_use]
    pub fn policies(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalog.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Forget memoized default resolutions. Explicit bindings stay.
    pub fn clear_cache(&self) {
        self.resolved.clear();
    }

    fn define_declared(&self) {
        for definition in declared_policies() {
            let name = definition.name().to_owned();
            if self.catalog.contains_key(&name) {
                warn!(policy = %name, "policy declared more than once; keeping the last declaration");
            }
            self.define(definition);
        }
    }

    fn insert_explicit(&self, resource_type: String, binding: PolicyBinding) {
        self.resolved.remove(&resource_type);
        self.explicit.insert(resource_type, binding);
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("suffix", &self.suffix)
            .field("policies", &self.policies())
            .field("bindings", &self.len())
            .finish_non_exhaustive()
    }
}

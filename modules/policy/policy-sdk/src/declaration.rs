//! Link-time policy declarations.
//!
//! Policy crates declare their definitions with [`declare_policy!`]; the
//! engine registry picks them up through [`declared_policies`] without a
//! hand-maintained list.

use crate::policy::PolicyDefinition;

/// A policy definition constructor registered at link time.
pub struct PolicyDeclaration {
    build: fn() -> PolicyDefinition,
}

impl PolicyDeclaration {
    #[must_use]
    pub const fn new(build: fn() -> PolicyDefinition) -> Self {
        Self { build }
    }

    /// Build the declared definition.
    #[must_use]
    pub fn build(&self) -> PolicyDefinition {
        (self.build)()
    }
}

inventory::collect!(PolicyDeclaration);

/// Declare a policy so the engine registry can find it by name.
///
/// Takes the path of a `fn() -> PolicyDefinition`:
///
/// ```ignore
/// fn post_policy() -> policy_sdk::PolicyDefinition { /* ... */ }
///
/// policy_sdk::declare_policy!(post_policy);
/// ```
#[macro_export]
macro_rules! declare_policy {
    ($build:path) => {
        $crate::inventory::submit! {
            $crate::PolicyDeclaration::new($build)
        }
    };
}

/// Every definition declared with [`declare_policy!`] in the linked binary.
pub fn declared_policies() -> impl Iterator<Item = PolicyDefinition> {
    inventory::iter::<PolicyDeclaration>
        .into_iter()
        .map(PolicyDeclaration::build)
}

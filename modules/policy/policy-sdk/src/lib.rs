#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Policy SDK
//!
//! This crate provides the contract shared by policy authors and the engine:
//!
//! - [`PolicyDefinition`] - A policy type: name, action handlers, scope action
//! - [`Policy`] - A policy bound to one (subject, resource) pair; runs the
//!   authorize lifecycle and normalizes handler return values
//! - [`AuthorizationResult`] - The settled record of one authorization attempt
//! - [`Outcome`] - What an action handler returned
//! - [`Resource`], [`ResourceClass`], [`Collection`] - Resource naming used for
//!   policy resolution
//! - [`Error`], [`ActionError`] - Error types
//! - [`declare_policy!`] - Static policy declarations picked up by the registry
//!
//! ## Usage
//!
//! ```ignore
//! use policy_sdk::{PolicyDefinition, Resource};
//!
//! struct Post { id: u64, owner: String }
//!
//! impl std::fmt::Display for Post {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "Post#{}", self.id)
//!     }
//! }
//!
//! impl Resource for Post {}
//!
//! fn post_policy() -> PolicyDefinition {
//!     PolicyDefinition::builder("PostPolicy")
//!         .action("update", |policy, _args| {
//!             let post = policy.resource_as::<Post>();
//!             Ok(post.is_some_and(|p| Some(p.owner.as_str()) == policy.subject_id()))
//!         })
//!         .build()
//! }
//!
//! policy_sdk::declare_policy!(post_policy);
//! ```

pub mod authorization;
pub mod declaration;
pub mod error;
pub mod outcome;
pub mod policy;
pub mod resource;

pub use arbiter_security::Subject;
pub use authorization::AuthorizationResult;
pub use declaration::{PolicyDeclaration, declared_policies};
pub use error::{
    ActionError, AuthorizationDenied, AuthorizationMissing, Error, ResolutionError, Result,
};
pub use outcome::Outcome;
pub use policy::{
    ANONYMOUS_SUBJECT, ActionHandler, DEFAULT_SCOPE_ACTION, FailureMessage, Policy,
    PolicyDefinition, PolicyDefinitionBuilder,
};
pub use resource::{
    AsAny, Collection, Resource, ResourceClass, resource_type_name, short_type_name,
};

#[doc(hidden)]
pub use inventory;

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Policy engine.
//!
//! Wires policy definitions from [`policy_sdk`] to callers:
//!
//! - [`PolicyRegistry`] - resource type → policy resolution, memoized
//! - [`AuthorizationGateway`] - the enforcement entry point for the request layer
//! - [`AuthorizationContext`] - request-scoped subject, default action and
//!   "was anything checked" flag
//! - [`EngineConfig`] - suffix, scope action, bindings, loaded with `figment`
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use policy_engine::{AuthorizationContext, AuthorizationGateway, EngineConfig, PolicyRegistry};
//!
//! let config = EngineConfig::load("config/arbiter.yaml")?;
//! let registry = Arc::new(PolicyRegistry::from_config(&config)?);
//! let gateway = AuthorizationGateway::new(registry).with_config(&config);
//!
//! let mut ctx = AuthorizationContext::new(Some(subject)).with_default_action("update");
//! gateway.authorize(&mut ctx, &post)?;
//! gateway.verify_authorized(&ctx)?;
//! ```

pub mod config;
pub mod context;
pub mod gateway;
pub mod registry;

pub use config::{DEFAULT_POLICY_SUFFIX, ENV_PREFIX, EngineConfig};
pub use context::AuthorizationContext;
pub use gateway::{AuthorizationGateway, AuthorizeRequest};
pub use registry::{PolicyBinding, PolicyRegistry};

pub use policy_sdk::{
    AuthorizationDenied, AuthorizationResult, Error, Outcome, PolicyDefinition, Resource, Result,
    Subject,
};

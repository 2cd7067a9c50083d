#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use policy_engine::{
    AuthorizationContext, AuthorizationGateway, AuthorizeRequest, EngineConfig, Error, Outcome,
    PolicyDefinition, PolicyRegistry, Resource, Subject,
};
use policy_sdk::{Collection, ResolutionError, declare_policy};

struct Invoice {
    number: u32,
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invoice#{}", self.number)
    }
}

impl Resource for Invoice {}

struct CreditNote;

impl fmt::Display for CreditNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CreditNote")
    }
}

impl Resource for CreditNote {}

struct Receipt;

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Receipt")
    }
}

impl Resource for Receipt {}

fn billing_rules() -> PolicyDefinition {
    PolicyDefinition::builder("InvoiceRules")
        .action("show", |policy, _| {
            Ok(policy.subject().is_some_and(|s| s.has_role("accountant")))
        })
        .action("browse", |_, _| Ok(true))
        .build()
}

fn receipt_rules() -> PolicyDefinition {
    PolicyDefinition::builder("ReceiptRules")
        .action("show", |_, _| Ok(true))
        .build()
}

declare_policy!(billing_rules);
declare_policy!(receipt_rules);

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

fn accountant() -> AuthorizationContext {
    let subject = Subject::builder("carol").role("accountant").build();
    AuthorizationContext::new(Some(subject)).with_default_action("show")
}

const CONFIG: &str = r"
policy_suffix: Rules
default_scope_action: browse
bindings:
  CreditNote: InvoiceRules
disabled:
  - Receipt
";

#[test]
fn configured_engine_resolves_with_the_custom_suffix() {
    let file = write_config(CONFIG);
    let config = EngineConfig::load(file.path()).unwrap();
    let registry = Arc::new(PolicyRegistry::from_config(&config).unwrap());
    let gateway = AuthorizationGateway::new(registry).with_config(&config);

    let outcome = gateway
        .authorize(&mut accountant(), &Invoice { number: 7 })
        .unwrap();

    assert_eq!(outcome, Outcome::Grant);
}

#[test]
fn configured_binding_reuses_another_policy() {
    let file = write_config(CONFIG);
    let config = EngineConfig::load(file.path()).unwrap();
    let registry = PolicyRegistry::from_config(&config).unwrap();

    assert_eq!(registry.resolve(&CreditNote).unwrap().name(), "InvoiceRules");
}

#[test]
fn disabled_type_is_a_resolution_error_even_when_a_policy_exists() {
    let file = write_config(CONFIG);
    let config = EngineConfig::load(file.path()).unwrap();
    let registry = PolicyRegistry::from_config(&config).unwrap();

    assert!(registry.definition("ReceiptRules").is_some());
    assert!(matches!(
        registry.resolve(&Receipt),
        Err(Error::Resolution(ResolutionError::Disabled { .. }))
    ));
}

#[test]
fn configured_scope_action_applies_to_collections() {
    let file = write_config(CONFIG);
    let config = EngineConfig::load(file.path()).unwrap();
    let registry = Arc::new(PolicyRegistry::from_config(&config).unwrap());
    let gateway = AuthorizationGateway::new(registry).with_config(&config);
    let mut ctx = AuthorizationContext::anonymous();

    gateway
        .authorize_scope(
            &mut ctx,
            &Collection::new(vec![Invoice { number: 1 }]),
            &AuthorizeRequest::new(),
        )
        .unwrap();

    assert_eq!(ctx.authorization().unwrap().action(), "browse");
}

#[test]
fn binding_to_an_undeclared_policy_fails_startup() {
    let file = write_config("bindings:\n  Invoice: LedgerRules\n");
    let config = EngineConfig::load(file.path()).unwrap();

    let err = PolicyRegistry::from_config(&config).unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("LedgerRules"));
}

#[test]
fn malformed_yaml_is_a_config_error() {
    let file = write_config("bindings: [not, a, map]\n");

    let err = EngineConfig::load(file.path()).unwrap_err();

    assert!(err.is_configuration());
}

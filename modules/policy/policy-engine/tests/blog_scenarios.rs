#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fmt;
use std::sync::Arc;

use policy_engine::{
    AuthorizationContext, AuthorizationGateway, AuthorizeRequest, Error, Outcome,
    PolicyDefinition, PolicyRegistry, Resource, Subject,
};
use policy_sdk::{ActionError, Collection, Policy, ResourceClass, declare_policy};
use serde_json::{Value, json};

struct Post {
    id: u64,
    author: &'static str,
    published: bool,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Post#{}", self.id)
    }
}

impl Resource for Post {}

struct Comment {
    id: u64,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comment#{}", self.id)
    }
}

impl Resource for Comment {}

fn is_author(policy: &Policy<'_>) -> bool {
    policy
        .resource_as::<Post>()
        .is_some_and(|post| Some(post.author) == policy.subject_id())
}

fn is_admin(policy: &Policy<'_>) -> bool {
    policy.subject().is_some_and(|s| s.has_role("admin"))
}

fn post_policy() -> PolicyDefinition {
    PolicyDefinition::builder("PostPolicy")
        .action("index", |_, _| Ok(json!([])))
        .action("create", |policy, _| Ok(policy.subject().is_some()))
        .action("show", |policy, _| {
            let published = policy.resource_as::<Post>().is_some_and(|p| p.published);
            Ok(published || is_author(policy))
        })
        .action("update", |policy, _| Ok(is_author(policy)))
        .action("destroy", |policy, _| {
            if is_admin(policy) {
                return Ok(Outcome::Grant);
            }
            Ok(Outcome::from("only admins may delete posts"))
        })
        .action("edit", |policy, args| {
            policy.delegate("update", args).map_err(ActionError::from)
        })
        .action("transfer", |policy, args: &[Value]| {
            if !is_author(policy) {
                return Err(ActionError::deny());
            }
            Ok(args.first().and_then(Value::as_str).is_some_and(|to| to != "mallory"))
        })
        .action("audit", |_, _| {
            Err::<bool, _>(ActionError::Failed(anyhow::anyhow!("audit log unavailable")))
        })
        .build()
}

declare_policy!(post_policy);

fn gateway() -> AuthorizationGateway {
    AuthorizationGateway::new(Arc::new(PolicyRegistry::with_declared()))
}

fn post() -> Post {
    Post {
        id: 42,
        author: "alice",
        published: false,
    }
}

fn ctx(subject: &str, action: &str) -> AuthorizationContext {
    AuthorizationContext::new(Some(Subject::new(subject))).with_default_action(action)
}

#[test]
fn guest_cannot_update_alices_post() {
    let gateway = gateway();
    let mut guest = ctx("guest", "update");

    let err = gateway.authorize(&mut guest, &post()).unwrap_err();

    assert!(err.is_denial());
    assert_eq!(
        err.to_string(),
        "access denied: guest is not authorized to update Post#42"
    );
    assert_eq!(
        guest.authorization().unwrap().messages,
        vec!["guest is not authorized to update Post#42".to_owned()]
    );
}

#[test]
fn alice_can_update_her_post() {
    let gateway = gateway();
    let mut alice = ctx("alice", "update");

    let outcome = gateway.authorize(&mut alice, &post()).unwrap();

    assert_eq!(outcome, Outcome::Grant);
    assert!(alice.authorization().unwrap().messages.is_empty());
    gateway.verify_authorized(&alice).unwrap();
}

#[test]
fn declared_policy_is_resolved_lazily() {
    let registry = PolicyRegistry::with_declared();

    assert!(registry.policies().contains(&"PostPolicy".to_owned()));
    assert!(!registry.is_cached("Post"));

    let first = registry.resolve(&post()).unwrap();
    let second = registry.resolve(&ResourceClass::<Post>::new()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.is_cached("Post"));
}

#[test]
fn resource_without_policy_is_not_a_denial() {
    let gateway = gateway();
    let mut alice = ctx("alice", "show");

    let err = gateway
        .authorized(&mut alice, &Comment { id: 7 }, &AuthorizeRequest::new())
        .unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
    assert!(err.is_configuration());
}

#[test]
fn string_reason_becomes_the_denial_message() {
    let gateway = gateway();
    let mut alice = ctx("alice", "destroy");

    let err = gateway.authorize(&mut alice, &post()).unwrap_err();

    assert_eq!(
        err.authorization().unwrap().messages,
        vec!["only admins may delete posts".to_owned()]
    );
}

#[test]
fn roles_from_the_subject_reach_the_handler() {
    let gateway = gateway();
    let admin = Subject::builder("root").role("admin").build();
    let mut ctx = AuthorizationContext::new(Some(admin)).with_default_action("destroy");

    assert_eq!(gateway.authorize(&mut ctx, &post()).unwrap(), Outcome::Grant);
}

#[test]
fn delegated_check_returns_the_nested_result() {
    let gateway = gateway();
    let mut alice = ctx("alice", "edit");

    let outcome = gateway.authorize(&mut alice, &post()).unwrap();

    let nested = outcome.delegated().unwrap();
    assert_eq!(nested.action(), "update");
    assert!(nested.is_granted());

    let mut guest = ctx("guest", "edit");
    let err = gateway.authorize(&mut guest, &post()).unwrap_err();
    assert_eq!(
        err.authorization().unwrap().messages,
        vec!["guest is not authorized to update Post#42".to_owned()]
    );
}

#[test]
fn handler_args_arrive_in_order() {
    let gateway = gateway();
    let transfer = |to: &str| AuthorizeRequest::new().action("transfer").arg(to);

    assert!(
        gateway
            .is_authorized(&mut ctx("alice", "show"), &post(), &transfer("bob"))
            .unwrap()
    );
    assert!(
        !gateway
            .is_authorized(&mut ctx("alice", "show"), &post(), &transfer("mallory"))
            .unwrap()
    );
    assert!(
        !gateway
            .is_authorized(&mut ctx("guest", "show"), &post(), &transfer("bob"))
            .unwrap()
    );
}

#[test]
fn business_errors_are_not_denials() {
    let gateway = gateway();
    let mut alice = ctx("alice", "audit");

    let err = gateway.authorize(&mut alice, &post()).unwrap_err();

    assert!(matches!(err, Error::Handler(_)));
    assert!(!err.is_denial());
    assert_eq!(err.to_string(), "audit log unavailable");
}

#[test]
fn empty_index_result_is_a_grant() {
    let gateway = gateway();
    let mut guest = ctx("guest", "update");
    let posts: Collection<Post> = Collection::new(Vec::new());

    let outcome = gateway
        .authorize_scope(&mut guest, &posts, &AuthorizeRequest::new())
        .unwrap();

    assert_eq!(outcome, Outcome::Other(json!([])));
    assert_eq!(guest.authorization().unwrap().action(), "index");
}

#[test]
fn class_level_checks_run_without_an_instance() {
    let gateway = gateway();
    let mut anonymous = AuthorizationContext::anonymous().with_default_action("create");

    let err = gateway
        .authorize(&mut anonymous, &ResourceClass::<Post>::new())
        .unwrap_err();

    assert_eq!(
        err.authorization().unwrap().messages,
        vec!["anonymous is not authorized to create Post".to_owned()]
    );
}

#[test]
fn unchecked_operation_fails_verification() {
    let gateway = gateway();
    let alice = ctx("alice", "update");

    assert!(matches!(
        gateway.verify_authorized(&alice),
        Err(Error::Missing(_))
    ));
}

//! Integration tests for data resolution
//!
//! Tests set/get/fetch semantics, defaults, the dual failure behavior of
//! `get`, and fetch cycle protection through nested fetchers.

use std::sync::Arc;

use verity_engine::{Registry, RegistryBuilder, RuleDef};
use verity_foundation::{ErrorKind, FetchFailure, Value};

fn empty_registry() -> Arc<Registry> {
    Arc::new(RegistryBuilder::new().finalize().unwrap())
}

// =============================================================================
// set / isSet
// =============================================================================

#[test]
fn absent_values_do_not_overwrite() {
    let registry = empty_registry();
    let mut context = registry.context();
    context.set("key", "original");
    context.set("key", Value::Nil);
    context.set("key", f64::NAN);
    assert_eq!(context.get("key").unwrap(), Some(Value::from("original")));
}

#[test]
fn absent_values_do_not_create_entries() {
    let registry = empty_registry();
    let mut context = registry.context();
    context.set("ghost", Value::Nil);
    assert!(!context.is_set("ghost"));
}

#[test]
fn falsy_defined_values_are_set() {
    let registry = empty_registry();
    let mut context = registry.context();
    context.set("flag", false).set("count", 0i64).set("name", "");
    assert!(context.is_set("flag"));
    assert!(context.is_set("count"));
    assert!(context.is_set("name"));
}

// =============================================================================
// get: dual failure behavior
// =============================================================================

#[test]
fn get_on_a_fresh_context_returns_empty_not_error() {
    let registry = empty_registry();
    let mut context = registry.context();
    assert_eq!(context.get("missingKey").unwrap(), None);
}

#[test]
fn get_inside_a_verify_chain_is_a_hard_404() {
    let mut builder = RegistryBuilder::new();
    builder.register_rule(
        "needsKey",
        RuleDef::new().predicate(|ctx| Ok(ctx.get("missingKey")?.is_some())),
    );
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    let err = context.verify(&["needsKey"]).unwrap_err();
    assert_eq!(err.code(), 404);
    assert!(matches!(err.kind, ErrorKind::MissingData { .. }));
}

#[test]
fn get_inside_a_fetcher_is_a_hard_404() {
    let mut builder = RegistryBuilder::new();
    builder.register_fetcher("profile", |ctx| {
        // Nested resolution of a key nobody can provide.
        let missing = ctx.get("accountId")?;
        Ok(missing)
    });
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    let err = context.fetch("profile").unwrap_err();
    assert_eq!(err.code(), 404);
    assert!(context.fetch_path().is_empty());
}

// =============================================================================
// Fetchers and defaults
// =============================================================================

#[test]
fn fetcher_chain_resolves_across_keys() {
    let mut builder = RegistryBuilder::new();
    builder.register_fetcher("org", |_| {
        Ok(Some(
            [("id", Value::from("org-1")), ("plan", Value::from("team"))]
                .into_iter()
                .collect(),
        ))
    });
    builder.register_fetcher("plan", |ctx| {
        let plan = ctx
            .get("org")?
            .and_then(|org| org.as_map().and_then(|m| m.get("plan")).cloned());
        Ok(plan)
    });
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    assert_eq!(context.get("plan").unwrap(), Some(Value::from("team")));
    // The nested get cached the org record too.
    assert!(context.is_set("org"));
    assert!(context.is_fetched("org"));
}

#[test]
fn mutually_recursive_fetchers_fail_with_the_full_path() {
    let mut builder = RegistryBuilder::new();
    builder.register_fetcher("user", |ctx| Ok(ctx.get("org")?));
    builder.register_fetcher("org", |ctx| Ok(ctx.get("user")?));
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    let err = context.fetch("user").unwrap_err();
    let path = err.cycle_path().unwrap().join(" -> ");
    assert_eq!(path, "user -> org");
    assert_eq!(
        err.reason(),
        "Circular dependency while fetching 'user', fetch path: user -> org -> user"
    );
    // Stack discipline: both pushes were matched by pops.
    assert!(context.fetch_path().is_empty());
}

#[test]
fn default_is_a_fallback_not_an_override() {
    let mut builder = RegistryBuilder::new();
    builder.set_default("role", "guest");
    builder.register_fetcher("tier", |_| Ok(Some(Value::from("pro"))));
    builder.set_default("tier", "free");
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    // No fetcher for role: the default applies.
    assert_eq!(context.get("role").unwrap(), Some(Value::from("guest")));
    // The tier fetcher succeeds, so its default never does.
    assert_eq!(context.get("tier").unwrap(), Some(Value::from("pro")));
}

#[test]
fn producer_defaults_see_already_set_data() {
    let mut builder = RegistryBuilder::new();
    builder.set_default_fn("greeting", |ctx| {
        let name = ctx
            .data_value("name")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| "stranger".to_string());
        Value::from(format!("hello, {name}"))
    });
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    context.set("name", "Ada");
    assert_eq!(
        context.get("greeting").unwrap(),
        Some(Value::from("hello, Ada"))
    );
}

#[test]
fn failed_fetcher_is_a_412_with_the_key() {
    let mut builder = RegistryBuilder::new();
    builder.register_fetcher("user", |_| Err(FetchFailure::external("timeout")));
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    let err = context.fetch("user").unwrap_err();
    assert_eq!(err.to_string(), "Couldn't fetch data for user: timeout [412]");
}

#[test]
fn fetch_errors_are_fatal_through_verifies() {
    let mut builder = RegistryBuilder::new();
    builder.register_rule(
        "needsUser",
        RuleDef::new().predicate(|ctx| Ok(ctx.get("user")?.is_some())),
    );
    builder.register_fetcher("user", |_| Err(FetchFailure::external("timeout")));
    let registry = Arc::new(builder.finalize().unwrap());
    let mut context = registry.context();
    let err = context.verifies(&["needsUser"]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Fetch { .. }));
}

// =============================================================================
// getId
// =============================================================================

#[test]
fn get_id_returns_identifiers_for_entities_and_raw_values_otherwise() {
    let mut builder = RegistryBuilder::new();
    builder.register_fetcher("user", |_| {
        Ok(Some(
            [("id", Value::from("u-1")), ("name", Value::from("Ada"))]
                .into_iter()
                .collect(),
        ))
    });
    let registry = Arc::new(builder.finalize().unwrap());

    let mut fetched = registry.context();
    assert_eq!(fetched.get_id("user").unwrap(), Some(Value::from("u-1")));

    let mut literal = registry.context();
    literal.set("count", 3i64);
    assert_eq!(literal.get_id("count").unwrap(), Some(Value::Int(3)));

    let mut unset = registry.context();
    assert_eq!(unset.get_id("nothing").unwrap(), None);
}

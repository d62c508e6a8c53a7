//! Integration tests for graph validation
//!
//! Tests cycle rejection at finalize and the topological ordering,
//! including a property test over randomly generated acyclic graphs.

use std::collections::HashMap;

use proptest::prelude::*;
use verity_engine::{RegistryBuilder, RuleDef};
use verity_foundation::ErrorKind;

fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{name} missing from order"))
}

#[test]
fn validation_happens_before_any_context_exists() {
    let mut builder = RegistryBuilder::new();
    builder.register_rule("a", RuleDef::new().uses(["b"]));
    builder.register_rule("b", RuleDef::new().uses(["a"]));
    // finalize consumes the builder; on failure there is no registry to
    // build a context from, so evaluation can never see a cyclic graph.
    let err = builder.finalize().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Cycle(_)));
    let path = err.cycle_path().unwrap();
    assert!(path.contains(&"a".to_string()));
    assert!(path.contains(&"b".to_string()));
}

#[test]
fn cycle_error_reports_the_exact_message() {
    let mut builder = RegistryBuilder::new();
    builder.register_rule("a", RuleDef::new().uses(["b"]));
    builder.register_rule("b", RuleDef::new().uses(["c"]));
    builder.register_rule("c", RuleDef::new().uses(["a"]));
    let err = builder.finalize().unwrap_err();
    assert_eq!(
        err.reason(),
        "Circular dependency \"a\" is required by \"c\": a -> b -> c"
    );
}

#[test]
fn implies_edges_count_for_cycle_detection() {
    let mut builder = RegistryBuilder::new();
    builder.register_rule("a", RuleDef::new().implies(["b"]));
    builder.register_rule("b", RuleDef::new().implies(["a"]));
    assert!(builder.finalize().is_err());
}

#[test]
fn implied_for_back_edges_count_for_cycle_detection() {
    // b depends on a, and implied_for makes a depend back on b.
    let mut builder = RegistryBuilder::new();
    builder.register_rule("a", RuleDef::new());
    builder.register_rule("b", RuleDef::new().uses(["a"]).implied_for(["a"]));
    let err = builder.finalize().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Cycle(_)));
}

#[test]
fn every_rule_appears_exactly_once_in_the_order() {
    let mut builder = RegistryBuilder::new();
    builder.register_rule("shared", RuleDef::new());
    builder.register_rule("left", RuleDef::new().uses(["shared"]));
    builder.register_rule("right", RuleDef::new().uses(["shared"]));
    builder.register_rule("root", RuleDef::new().uses(["left", "right"]));
    let registry = builder.finalize().unwrap();
    let order = registry.sorted_rules();
    assert_eq!(order.len(), 4);
    assert!(position(order, "shared") < position(order, "left"));
    assert!(position(order, "shared") < position(order, "right"));
    assert!(position(order, "left") < position(order, "root"));
    assert!(position(order, "right") < position(order, "root"));
}

proptest! {
    /// For any acyclic rule set, every rule lands strictly after all rules
    /// in its `uses` set. Edges only point from higher to lower index, so
    /// the generated graph is acyclic by construction.
    #[test]
    fn topological_order_respects_uses(
        edges in prop::collection::vec((1usize..16, 0usize..16), 0..48)
    ) {
        let mut uses: HashMap<usize, Vec<String>> = HashMap::new();
        for (from, to) in edges {
            if to < from {
                uses.entry(from).or_default().push(format!("r{to}"));
            }
        }

        let mut builder = RegistryBuilder::new();
        for i in 0..16 {
            let deps = uses.remove(&i).unwrap_or_default();
            builder.register_rule(format!("r{i}"), RuleDef::new().uses(deps));
        }
        let registry = builder.finalize().unwrap();
        let order = registry.sorted_rules();

        for i in 0..16 {
            let name = format!("r{i}");
            let rule_pos = position(order, &name);
            for dep in &registry.rule(&name).unwrap().uses {
                prop_assert!(position(order, dep) < rule_pos);
            }
        }
    }
}

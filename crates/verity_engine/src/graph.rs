//! Startup validation of the rule dependency graph.
//!
//! Walks every rule's `uses` edges depth-first, carrying the explicit
//! ancestor chain of the current walk so a cycle can be reported with its
//! full path, and produces a topological ordering in which every rule
//! appears after all of its dependencies.

use std::collections::{HashMap, HashSet};

use im::Vector;
use verity_foundation::{Error, Result};

use crate::registry::Rule;

/// Validates the `uses` graph and returns the topological order.
///
/// # Errors
/// Returns a cycle error carrying the exact ancestor path if a closed chain
/// exists, or an unknown-rule error if an edge points at an unregistered
/// rule.
pub(crate) fn validate(rules: &HashMap<String, Rule>) -> Result<Vec<String>> {
    let mut sorted = Vec::with_capacity(rules.len());
    let mut processed = HashSet::with_capacity(rules.len());

    // Walk roots in name order so the produced ordering is deterministic.
    let mut names: Vec<&String> = rules.keys().collect();
    names.sort();

    for name in names {
        visit(name, &Vector::new(), rules, &mut processed, &mut sorted)?;
    }
    Ok(sorted)
}

/// Visits one node with the ancestor chain of the current walk.
///
/// The chain is a persistent vector: each recursive branch extends its own
/// copy in O(1), so sibling branches never observe each other's extensions.
fn visit(
    name: &str,
    ancestors: &Vector<String>,
    rules: &HashMap<String, Rule>,
    processed: &mut HashSet<String>,
    sorted: &mut Vec<String>,
) -> Result<()> {
    if processed.contains(name) {
        return Ok(());
    }

    let mut chain = ancestors.clone();
    chain.push_back(name.to_string());

    let rule = rules
        .get(name)
        .ok_or_else(|| Error::unknown_rule(name))?;
    for dep in &rule.uses {
        if chain.iter().any(|ancestor| ancestor == dep) {
            return Err(Error::graph_cycle(dep, chain.iter().cloned().collect()));
        }
        if processed.contains(dep.as_str()) {
            continue;
        }
        visit(dep, &chain, rules, processed, sorted)?;
    }

    // Post-order append: dependencies land before their dependents.
    sorted.push(name.to_string());
    processed.insert(name.to_string());
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

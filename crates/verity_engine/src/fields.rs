//! Field optimization: minimal per-key fetch requirements.
//!
//! When enabled, a top-level verify first expands the requested rule set to
//! its transitive `uses` closure and merges every rule's declared field
//! needs per data key. Fetchers consult [`Context::requested_fields`] to
//! fetch only those sub-fields. Widening the requirement for an
//! already-resolved key clears its fetched flag so the next `get`
//! re-fetches with the larger set.

use std::collections::{BTreeSet, HashMap, HashSet};

use verity_foundation::{Error, Result};

use crate::context::Context;

/// Wildcard sub-field: the key needs the full record.
const ALL_FIELDS: &str = "*";

impl Context {
    /// The sub-fields a fetcher should fetch for `key`.
    ///
    /// `None` means no restriction: field optimization is off, no rule
    /// declared fields for the key, or a rule asked for the wildcard `"*"`.
    #[must_use]
    pub fn requested_fields(&self, key: &str) -> Option<&BTreeSet<String>> {
        if !self.options.optimize_fields {
            return None;
        }
        let fields = self.fields.get(key)?;
        if fields.contains(ALL_FIELDS) {
            return None;
        }
        Some(fields)
    }

    /// Computes and installs the merged field requirements for a requested
    /// rule set, clearing the fetched flag of any key whose requirement grew.
    pub(crate) fn calc_fields(&mut self, rules: &[&str]) -> Result<()> {
        let closure = self.expand_rules(rules)?;

        let mut merged: HashMap<String, BTreeSet<String>> = HashMap::new();
        for name in &closure {
            let rule = self
                .registry
                .rule(name)
                .expect("closure members are registered");
            for (key, subfields) in &rule.fields {
                merged
                    .entry(key.clone())
                    .or_default()
                    .extend(subfields.iter().cloned());
            }
        }

        // A requirement wider than what a key was resolved with forces a
        // re-fetch; memoized rule results are left alone.
        for (key, required) in &merged {
            if let Some(previous) = self.fields.get(key) {
                if required.difference(previous).next().is_some() {
                    self.fetched.insert(key.clone(), false);
                }
            }
        }

        self.fields = merged;
        Ok(())
    }

    /// Expands a rule set to its transitive closure over `uses`.
    fn expand_rules(&self, rules: &[&str]) -> Result<Vec<String>> {
        let mut closure = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Vec<String> = rules.iter().map(ToString::to_string).collect();
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let rule = self
                .registry
                .rule(&name)
                .ok_or_else(|| Error::unknown_rule(&name))?;
            pending.extend(rule.uses.iter().cloned());
            closure.push(name);
        }
        Ok(closure)
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Rule expansion and execution.
//!
//! `verify` runs each requested rule exactly once per context, implied rules
//! first, with the verify path stack guarding against runtime re-entry
//! (a predicate calling back into `verify` on a rule already in flight).
//! Outcomes are memoized per context; the first falsy predicate aborts the
//! run with a structured failure, leaving partial results in place for
//! inspection.

use std::collections::HashSet;
use std::sync::Arc;

use verity_foundation::{Error, Result, Value};

use crate::context::{Context, ContextOptions};
use crate::registry::Registry;

impl Context {
    /// Verifies the named rules in order, dependency-first.
    ///
    /// On success returns the context for chaining; on failure the error
    /// propagates after all path stacks are restored, and memoized partial
    /// results remain attached for inspection.
    ///
    /// # Errors
    /// Unknown rule names, verify/fetch cycles, fetch failures, unresolvable
    /// data, and predicate failures, in the order encountered.
    pub fn verify(&mut self, rules: &[&str]) -> Result<&mut Self> {
        // Only a user-initiated call computes field requirements; nested
        // calls from predicates see a non-empty verify path and skip this.
        if self.verify_path.is_empty() && self.options.optimize_fields {
            self.calc_fields(rules)?;
        }

        for name in rules {
            self.verify_rule(name)?;
        }
        Ok(self)
    }

    /// Verifies a single rule; shorthand for `verify(&[rule])`.
    ///
    /// # Errors
    /// Same failure modes as [`Context::verify`].
    pub fn verify_one(&mut self, rule: &str) -> Result<&mut Self> {
        self.verify(&[rule])
    }

    /// Boolean form of [`Context::verify`].
    ///
    /// Returns `Ok(false)` exactly for the soft failure class (predicate
    /// failure, unresolvable data); any other error — cycle, unknown rule,
    /// fetch failure — is re-raised unchanged.
    ///
    /// # Errors
    /// Every non-soft failure mode of [`Context::verify`].
    pub fn verifies(&mut self, rules: &[&str]) -> Result<bool> {
        match self.verify(rules) {
            Ok(_) => Ok(true),
            Err(err) if err.is_soft() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn verify_rule(&mut self, name: &str) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let Some(rule) = registry.rule(name) else {
            return Err(Error::unknown_rule(name));
        };

        // Already decided in this context.
        if self.verify_results.contains_key(name) {
            return Ok(());
        }

        if self.verify_path.iter().any(|n| n == name) {
            return Err(Error::verify_cycle(name, self.verify_path.clone()));
        }

        self.verify_path.push(name.to_string());
        let previous = self.current_verifier.replace(name.to_string());

        // Implied rules resolve (and memoize) before the predicate runs:
        // the predicate may read data they fetched as a side effect.
        let outcome = self
            .verify_implied(&rule.implies)
            .and_then(|()| (rule.predicate)(self));

        // Restore on every exit path, nested failures included.
        self.verify_path.pop();
        self.current_verifier = previous;

        let passed = outcome?;
        self.verify_results.insert(name.to_string(), passed);
        if passed {
            Ok(())
        } else {
            Err(Error::predicate_failure(name))
        }
    }

    fn verify_implied(&mut self, implies: &[String]) -> Result<()> {
        for name in implies {
            self.verify_rule(name)?;
        }
        Ok(())
    }

    /// Drops the memoized result of `rule` and, transitively, the results of
    /// every memoized rule whose `uses` reach it.
    ///
    /// For callers that mutate data mid-stream and need affected rules
    /// re-verified; the engine never cascades invalidation on its own.
    pub fn invalidate_result(&mut self, rule: &str) -> &mut Self {
        let registry = Arc::clone(&self.registry);
        let mut pending = vec![rule.to_string()];
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            self.verify_results.remove(&current);
            for name in self.verify_results.keys() {
                let depends = registry
                    .rule(name)
                    .is_some_and(|r| r.uses.iter().any(|u| *u == current));
                if depends {
                    pending.push(name.clone());
                }
            }
        }
        self
    }
}

// =============================================================================
// One-shot convenience
// =============================================================================

/// Options for [`run_verification`].
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Clean the context before returning it (default true). Keep the data
    /// by turning this off, e.g. to inspect what the rules fetched.
    pub reset: bool,
    /// Forwarded to [`ContextOptions::optimize_fields`].
    pub optimize_fields: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reset: true,
            optimize_fields: false,
        }
    }
}

/// Sets all `data` entries on a fresh context, verifies `rules`, and
/// returns the context.
///
/// # Errors
/// Same failure modes as [`Context::verify`].
pub fn run_verification<I, K, V>(
    registry: &Arc<Registry>,
    data: I,
    rules: &[&str],
    options: RunOptions,
) -> Result<Context>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut context = registry.context_with(ContextOptions {
        optimize_fields: options.optimize_fields,
    });
    for (key, value) in data {
        context.set(key.as_ref(), value);
    }
    context.verify(rules)?;
    if options.reset {
        context.clean();
    }
    Ok(context)
}

// =============================================================================
// Tests
// =============================================================================

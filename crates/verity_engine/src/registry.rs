//! Rule, fetcher, and default-value registration.
//!
//! The registry is append-oriented and populated once: rules, fetchers, and
//! defaults accumulate in a [`RegistryBuilder`], and [`RegistryBuilder::finalize`]
//! runs the dependency-graph validation and freezes everything into a
//! [`Registry`]. Contexts can only be built from a finalized registry, so a
//! cyclic rule graph can never reach evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use verity_foundation::{FetchFailure, Result, Value};

use crate::context::{Context, ContextOptions};
use crate::graph;

/// Predicate invoked with the owning context; the boolean decides pass/fail.
pub type PredicateFn = Arc<dyn Fn(&mut Context) -> Result<bool> + Send + Sync>;

/// Lazy resolver for one data key.
///
/// Invoked with the owning context so it may `get` other keys (nested
/// resolution); `Ok(None)` means the fetch yielded nothing and the default
/// value, if any, applies.
pub type FetcherFn =
    Arc<dyn Fn(&mut Context) -> Result<Option<Value>, FetchFailure> + Send + Sync>;

/// Producer for a default value, invoked with the owning context.
pub type ProducerFn = Arc<dyn Fn(&mut Context) -> Value + Send + Sync>;

fn always_true() -> PredicateFn {
    Arc::new(|_| Ok(true))
}

// =============================================================================
// RuleDef
// =============================================================================

/// Declarative definition of one rule, consumed by
/// [`RegistryBuilder::register_rule`].
#[derive(Clone)]
pub struct RuleDef {
    predicate: PredicateFn,
    implies: Vec<String>,
    uses: Vec<String>,
    implied_for: Vec<String>,
    fields: HashMap<String, Vec<String>>,
}

impl RuleDef {
    /// Creates an empty definition with an always-true predicate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            predicate: always_true(),
            implies: Vec::new(),
            uses: Vec::new(),
            implied_for: Vec::new(),
            fields: HashMap::new(),
        }
    }

    /// Sets the predicate.
    #[must_use]
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&mut Context) -> Result<bool> + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Rules that must also pass before this rule's predicate runs.
    #[must_use]
    pub fn implies<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implies.extend(rules.into_iter().map(Into::into));
        self
    }

    /// Ordering-only dependencies (need not pass, only precede).
    #[must_use]
    pub fn uses<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uses.extend(rules.into_iter().map(Into::into));
        self
    }

    /// Already-registered rules that should treat this rule as implied.
    #[must_use]
    pub fn implied_for<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implied_for.extend(rules.into_iter().map(Into::into));
        self
    }

    /// Declares the sub-fields of a data key this rule needs.
    #[must_use]
    pub fn fields<I, S>(mut self, key: impl Into<String>, subfields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(key.into())
            .or_default()
            .extend(subfields.into_iter().map(Into::into));
        self
    }
}

impl Default for RuleDef {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A registered, normalized rule.
///
/// Invariant: `uses` is a superset of `implies`, deduplicated, insertion
/// order retained for diagnostics.
pub struct Rule {
    /// Unique rule name.
    pub name: String,
    pub(crate) predicate: PredicateFn,
    /// Rules that must also pass, verified before this rule's predicate.
    pub implies: Vec<String>,
    /// All ordering dependencies (`implies` plus ordering-only edges).
    pub uses: Vec<String>,
    /// Required sub-fields per data key.
    pub fields: HashMap<String, Vec<String>>,
}

// =============================================================================
// Default values
// =============================================================================

/// Fallback for a data key, used only when fetching yields nothing.
#[derive(Clone)]
pub enum DefaultValue {
    /// A literal value.
    Literal(Value),
    /// A producer invoked with the context.
    Producer(ProducerFn),
}

impl DefaultValue {
    /// Wraps a literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Wraps a producer function.
    pub fn producer<F>(producer: F) -> Self
    where
        F: Fn(&mut Context) -> Value + Send + Sync + 'static,
    {
        Self::Producer(Arc::new(producer))
    }

    pub(crate) fn resolve(&self, context: &mut Context) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(producer) => producer(context),
        }
    }
}

// =============================================================================
// RegistryBuilder
// =============================================================================

/// Mutable registration surface, consumed by [`RegistryBuilder::finalize`].
#[derive(Default)]
pub struct RegistryBuilder {
    rules: HashMap<String, Rule>,
    fetchers: HashMap<String, FetcherFn>,
    defaults: HashMap<String, DefaultValue>,
    /// Applied `implied_for` back-edges, `(implied rule, target)`. Kept so a
    /// re-registered target gets its edges rebuilt onto the new definition.
    back_edges: Vec<(String, String)>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one rule under `name`.
    ///
    /// Normalizes the definition (`uses = dedupe(uses ∪ implies)`), stores
    /// it, then applies its `implied_for` back-edges in place onto
    /// already-registered targets. Targets that are not registered yet are
    /// silently skipped. Re-registration replaces the prior definition and
    /// rebuilds back-edges other rules had applied onto it.
    pub fn register_rule(&mut self, name: impl Into<String>, def: RuleDef) -> &mut Self {
        let name = name.into();
        let mut uses: Vec<String> = Vec::new();
        for dep in def.uses.into_iter().chain(def.implies.iter().cloned()) {
            if !uses.contains(&dep) {
                uses.push(dep);
            }
        }
        self.rules.insert(
            name.clone(),
            Rule {
                name: name.clone(),
                predicate: def.predicate,
                implies: def.implies,
                uses,
                fields: def.fields,
            },
        );

        // Rebuild back-edges pointing at a replaced definition.
        let rebuilt: Vec<String> = self
            .back_edges
            .iter()
            .filter(|(_, target)| *target == name)
            .map(|(implied, _)| implied.clone())
            .collect();
        for implied in rebuilt {
            self.apply_back_edge(&implied, &name);
        }

        for target in def.implied_for {
            if self.rules.contains_key(&target) && self.apply_back_edge(&name, &target) {
                self.back_edges.push((name.clone(), target));
            }
        }
        self
    }

    /// Registers a batch of rules.
    pub fn register_rules<I, S>(&mut self, rules: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, RuleDef)>,
        S: Into<String>,
    {
        for (name, def) in rules {
            self.register_rule(name, def);
        }
        self
    }

    /// Adds `implied` to `target`'s `implies`/`uses`, skipping if present.
    /// Returns whether the edge was newly applied.
    fn apply_back_edge(&mut self, implied: &str, target: &str) -> bool {
        let Some(rule) = self.rules.get_mut(target) else {
            return false;
        };
        if rule.uses.iter().any(|u| u == implied) {
            return false;
        }
        rule.implies.push(implied.to_string());
        rule.uses.push(implied.to_string());
        true
    }

    /// Registers a fetcher for a data key.
    pub fn register_fetcher<F>(&mut self, key: impl Into<String>, fetcher: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<Option<Value>, FetchFailure> + Send + Sync + 'static,
    {
        self.fetchers.insert(key.into(), Arc::new(fetcher));
        self
    }

    /// Registers a batch of fetchers.
    pub fn register_fetchers<I, S>(&mut self, fetchers: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, FetcherFn)>,
        S: Into<String>,
    {
        for (key, fetcher) in fetchers {
            self.fetchers.insert(key.into(), fetcher);
        }
        self
    }

    /// Registers a literal default value for a data key.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.defaults
            .insert(key.into(), DefaultValue::literal(value));
        self
    }

    /// Registers a producer default for a data key.
    pub fn set_default_fn<F>(&mut self, key: impl Into<String>, producer: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Value + Send + Sync + 'static,
    {
        self.defaults
            .insert(key.into(), DefaultValue::producer(producer));
        self
    }

    /// Registers a batch of defaults.
    pub fn set_defaults<I, S>(&mut self, defaults: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, DefaultValue)>,
        S: Into<String>,
    {
        for (key, value) in defaults {
            self.defaults.insert(key.into(), value);
        }
        self
    }

    /// Validates the rule dependency graph and freezes the registry.
    ///
    /// # Errors
    /// Returns a cycle error (with the exact ancestor path) if the `uses`
    /// graph has a closed chain, or an unknown-rule error if an edge points
    /// at an unregistered rule. No [`Registry`] exists on failure, so
    /// evaluation can never observe an invalid graph.
    pub fn finalize(self) -> Result<Registry> {
        let sorted = graph::validate(&self.rules)?;
        Ok(Registry {
            rules: self.rules,
            fetchers: self.fetchers,
            defaults: self.defaults,
            sorted,
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// The frozen, validated rule table shared by all contexts.
///
/// Only obtainable through [`RegistryBuilder::finalize`]; read-only
/// afterward, so sharing via [`Arc`] needs no locking.
pub struct Registry {
    rules: HashMap<String, Rule>,
    fetchers: HashMap<String, FetcherFn>,
    defaults: HashMap<String, DefaultValue>,
    sorted: Vec<String>,
}

impl Registry {
    /// Looks up a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Checks whether a rule is registered.
    #[must_use]
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Looks up a fetcher by data key.
    #[must_use]
    pub fn fetcher(&self, key: &str) -> Option<&FetcherFn> {
        self.fetchers.get(key)
    }

    /// Checks whether a fetcher is registered for a data key.
    #[must_use]
    pub fn has_fetcher(&self, key: &str) -> bool {
        self.fetchers.contains_key(key)
    }

    /// Looks up the default value for a data key.
    #[must_use]
    pub fn default_value(&self, key: &str) -> Option<&DefaultValue> {
        self.defaults.get(key)
    }

    /// Checks whether a default is registered for a data key.
    #[must_use]
    pub fn has_default(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// The validator's topological ordering: every rule appears after all
    /// rules in its `uses` set. Diagnostic/reference ordering.
    #[must_use]
    pub fn sorted_rules(&self) -> &[String] {
        &self.sorted
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Creates a fresh context over this registry.
    #[must_use]
    pub fn context(self: &Arc<Self>) -> Context {
        Context::new(Arc::clone(self))
    }

    /// Creates a fresh context with explicit options.
    #[must_use]
    pub fn context_with(self: &Arc<Self>, options: ContextOptions) -> Context {
        Context::with_options(Arc::clone(self), options)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("rules", &self.sorted)
            .field("fetchers", &self.fetchers.keys().collect::<Vec<_>>())
            .field("defaults", &self.defaults.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

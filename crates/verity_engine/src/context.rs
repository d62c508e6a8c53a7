//! Per-evaluation verification context.
//!
//! A [`Context`] owns all mutable state of one evaluation pipeline: the data
//! cache, the fetch/verify path stacks used as cycle guards, the memoized
//! rule results, and the computed field requirements. Exactly one evaluation
//! may be in flight against a context at a time; independent contexts share
//! nothing but the frozen [`Registry`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use verity_foundation::Value;

use crate::registry::Registry;

// =============================================================================
// ContextOptions
// =============================================================================

/// Configuration for one context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextOptions {
    /// Compute the minimal per-key field requirements of the expanded rule
    /// set before each top-level verify, so fetchers can fetch less.
    /// Off by default.
    pub optimize_fields: bool,
}

// =============================================================================
// Context
// =============================================================================

/// Mutable, per-evaluation state container.
///
/// Invariants: `fetch_path` and `verify_path` are empty before a top-level
/// call begins and after it returns, success or failure; memoized results
/// are write-once for the lifetime of the context (until [`Context::clean`]).
pub struct Context {
    pub(crate) registry: Arc<Registry>,
    pub(crate) options: ContextOptions,
    /// Data values, keyed by data key.
    pub(crate) data: HashMap<String, Value>,
    /// Whether a key holds a final, fetch-resolved value.
    pub(crate) fetched: HashMap<String, bool>,
    /// Keys currently being fetched; ancestor chain for cycle detection.
    pub(crate) fetch_path: Vec<String>,
    /// Rules currently being verified; ancestor chain for cycle detection.
    pub(crate) verify_path: Vec<String>,
    /// Memoized rule outcomes for this context only.
    pub(crate) verify_results: HashMap<String, bool>,
    /// Required sub-fields per data key (field optimization only).
    pub(crate) fields: HashMap<String, BTreeSet<String>>,
    /// The rule currently executing, for error messages.
    pub(crate) current_verifier: Option<String>,
}

impl Context {
    /// Creates a fresh context with default options.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_options(registry, ContextOptions::default())
    }

    /// Creates a fresh context with explicit options.
    #[must_use]
    pub fn with_options(registry: Arc<Registry>, options: ContextOptions) -> Self {
        Self {
            registry,
            options,
            data: HashMap::new(),
            fetched: HashMap::new(),
            fetch_path: Vec::new(),
            verify_path: Vec::new(),
            verify_results: HashMap::new(),
            fields: HashMap::new(),
            current_verifier: None,
        }
    }

    /// Discards all cached data and results, keeping options and registry.
    ///
    /// Equivalent to re-creating the context; lets callers reuse one context
    /// object across unrelated evaluations.
    pub fn clean(&mut self) -> &mut Self {
        let options = self.options;
        self.clean_with(options)
    }

    /// Like [`Context::clean`], but with new options.
    pub fn clean_with(&mut self, options: ContextOptions) -> &mut Self {
        self.options = options;
        self.data.clear();
        self.fetched.clear();
        self.fetch_path.clear();
        self.verify_path.clear();
        self.verify_results.clear();
        self.fields.clear();
        self.current_verifier = None;
        self
    }

    /// The options this context was built with.
    #[must_use]
    pub fn options(&self) -> ContextOptions {
        self.options
    }

    /// The registry this context evaluates against.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Memoized outcome of a rule in this context, if it has run.
    #[must_use]
    pub fn result_of(&self, rule: &str) -> Option<bool> {
        self.verify_results.get(rule).copied()
    }

    /// All memoized rule outcomes, including partial results after a failure.
    #[must_use]
    pub fn results(&self) -> &HashMap<String, bool> {
        &self.verify_results
    }

    /// Whether a key holds a final, fetch-resolved value.
    #[must_use]
    pub fn is_fetched(&self, key: &str) -> bool {
        self.fetched.get(key).copied().unwrap_or(false)
    }

    /// The raw stored value for a key, without triggering resolution.
    ///
    /// Fetchers use this to read a stand-in value for the key they are
    /// expanding; calling `get` there would re-enter the fetch path.
    #[must_use]
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The rule currently executing, if any.
    #[must_use]
    pub fn current_verifier(&self) -> Option<&str> {
        self.current_verifier.as_deref()
    }

    /// The rules currently being verified, outermost first.
    #[must_use]
    pub fn verify_path(&self) -> &[String] {
        &self.verify_path
    }

    /// The keys currently being fetched, outermost first.
    #[must_use]
    pub fn fetch_path(&self) -> &[String] {
        &self.fetch_path
    }

    /// Whether resolution is happening inside an active verify/fetch chain.
    ///
    /// Determines the failure mode of `get`: hard error inside a chain,
    /// silent empty result outside.
    pub(crate) fn in_active_chain(&self) -> bool {
        !self.fetch_path.is_empty() || !self.verify_path.is_empty()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .field("data", &self.data)
            .field("fetched", &self.fetched)
            .field("fetch_path", &self.fetch_path)
            .field("verify_path", &self.verify_path)
            .field("verify_results", &self.verify_results)
            .field("fields", &self.fields)
            .field("current_verifier", &self.current_verifier)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

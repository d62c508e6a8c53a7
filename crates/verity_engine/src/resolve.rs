//! Data resolution primitives on a [`Context`].
//!
//! A key resolves, in order, from an already-set value, a registered
//! fetcher, or a default. Fetchers run with the context as receiver so they
//! may `get` other keys; the fetch path stack guards that recursion against
//! cycles, and every push is matched by a pop on every exit route.

use std::sync::Arc;

use verity_foundation::{Error, FetchFailure, Result, Value};

use crate::context::Context;

impl Context {
    /// Stores `value` under `key`.
    ///
    /// Absent values (nil, NaN) are a no-op, leaving any previous value
    /// untouched. The key is marked fetched (final) unless the value is a
    /// string and a fetcher is registered under `key` — string stand-ins
    /// stay eligible for expansion by a later `get`.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if value.is_absent() {
            return self;
        }

        let has_fetcher = self.registry.has_fetcher(key);
        let is_string = matches!(value, Value::String(_));
        self.fetched
            .insert(key.to_string(), !(is_string && has_fetcher));

        if self.options.optimize_fields && !is_string && has_fetcher {
            // Record which fields a directly-set record carries, so a later
            // wider requirement triggers a re-fetch.
            if let Value::Map(map) = &value {
                self.fields
                    .insert(key.to_string(), map.keys().cloned().collect());
            }
        }

        self.data.insert(key.to_string(), value);
        self
    }

    /// Whether a value is stored under `key`, truthy or not.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Resolves and returns the value for `key`.
    ///
    /// Inside an active verify/fetch chain an unresolvable key is a hard
    /// [`ErrorKind::MissingData`](verity_foundation::ErrorKind::MissingData)
    /// failure naming the current verifier; outside any chain the failure is
    /// swallowed and `Ok(None)` is returned.
    ///
    /// # Errors
    /// Propagates cycle, fetch, and missing-data errors when called from
    /// within a predicate or fetcher.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>> {
        let nested = self.in_active_chain();
        match self.resolve(key) {
            Ok(()) => Ok(self.data.get(key).cloned()),
            Err(_) if !nested => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Like [`Context::get`], but entity-shaped values (maps carrying an
    /// `"id"` entry) resolve to their identifier.
    ///
    /// Lets rules compare or store lightweight identifiers instead of full
    /// fetched records. A key that is already set is returned as-is without
    /// triggering a fetch.
    ///
    /// # Errors
    /// Same failure modes as [`Context::get`].
    pub fn get_id(&mut self, key: &str) -> Result<Option<Value>> {
        let value = if !self.is_set(key) && self.registry.has_fetcher(key) {
            self.get(key)?
        } else {
            self.data.get(key).cloned()
        };
        Ok(value.map(|v| match v.id() {
            Some(id) => id.clone(),
            None => v,
        }))
    }

    /// Whether a default value is registered for `key`.
    #[must_use]
    pub fn has_default(&self, key: &str) -> bool {
        self.registry.has_default(key)
    }

    /// Resolves `key` in place: stored value, then fetcher, then default.
    fn resolve(&mut self, key: &str) -> Result<()> {
        if self.is_set(key) && self.is_fetched(key) {
            return Ok(());
        }
        if self.fetch(key)?.is_some() {
            return Ok(());
        }
        if self.registry.has_default(key) {
            self.apply_default(key);
            if self.is_set(key) {
                return Ok(());
            }
        }
        Err(Error::missing_data(key, self.current_verifier.clone()))
    }

    /// Runs the registered fetcher for `key`, if any and not yet fetched.
    ///
    /// Returns the resolved value, or `None` when nothing could be fetched.
    /// With no fetcher registered (or the key already final) this is a no-op
    /// returning the already-set value.
    ///
    /// # Errors
    /// Fails with a cycle error if `key` is already on the fetch path.
    /// Engine errors from nested resolution inside the fetcher propagate
    /// unchanged; the fetcher's own external failures are wrapped into
    /// [`ErrorKind::Fetch`](verity_foundation::ErrorKind::Fetch) with `key`.
    pub fn fetch(&mut self, key: &str) -> Result<Option<Value>> {
        if !self.registry.has_fetcher(key) || self.is_fetched(key) {
            return Ok(self.data.get(key).cloned());
        }

        if self.fetch_path.iter().any(|k| k == key) {
            return Err(Error::fetch_cycle(key, self.fetch_path.clone()));
        }

        let registry = Arc::clone(&self.registry);
        let fetcher = registry
            .fetcher(key)
            .cloned()
            .expect("presence checked above");

        self.fetch_path.push(key.to_string());
        let outcome = fetcher(self);
        self.fetch_path.pop();

        let fetched = match outcome {
            Ok(value) => value,
            Err(FetchFailure::Engine(err)) => return Err(err),
            Err(FetchFailure::External(cause)) => return Err(Error::fetch_failed(key, cause)),
        };

        match fetched {
            Some(value) if !value.is_absent() => {
                self.set(key, value.clone());
                // A fetched string is final; the stand-in rule only applies
                // to values set from outside.
                self.fetched.insert(key.to_string(), true);
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    /// Applies the registered default for `key`, literal or producer.
    fn apply_default(&mut self, key: &str) {
        let registry = Arc::clone(&self.registry);
        if let Some(default) = registry.default_value(key) {
            let value = default.resolve(self);
            self.set(key, value);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

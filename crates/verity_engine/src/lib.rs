//! Rule registry, dependency validation, and the verification engine for Verity.
//!
//! This crate provides:
//! - [`RuleDef`] / [`RegistryBuilder`] - Declarative rule, fetcher, and
//!   default-value registration
//! - [`Registry`] - The frozen, validated rule table (cycle-checked and
//!   topologically ordered at [`RegistryBuilder::finalize`])
//! - [`Context`] - Per-evaluation state: data cache, cycle-guard stacks,
//!   memoized results, and lazy data resolution through fetchers
//! - [`run_verification`] - One-shot convenience around the above

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod context;
mod fields;
mod graph;
pub mod registry;
mod resolve;
mod verify;

pub use context::{Context, ContextOptions};
pub use registry::{
    DefaultValue, FetcherFn, PredicateFn, ProducerFn, Registry, RegistryBuilder, Rule, RuleDef,
};
pub use verify::{RunOptions, run_verification};

//! Verity - Declarative, dependency-aware rule verification engine
//!
//! This crate re-exports all layers of the Verity system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: verity_engine     — Registry, graph validation, contexts,
//!                              verification, lazy data resolution
//! Layer 0: verity_foundation — Core types (Value, Error)
//! ```

pub use verity_engine as engine;
pub use verity_foundation as foundation;

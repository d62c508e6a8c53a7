//! Core types for the Verity verification engine.
//!
//! This crate provides:
//! - [`Value`] - The dynamic value type for all context data
//! - [`Error`] - The unified error taxonomy with host-facing codes
//! - [`Result`] - Crate-wide result alias

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod value;

pub use error::{CyclePath, CycleSite, Error, ErrorKind, FetchFailure, Result};
pub use value::{ID_FIELD, Value};

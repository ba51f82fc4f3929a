//! Core types and trait definitions for the reliability analysis engine.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement the traits in [`store`]; the [`analysis::Analyzer`] drives one
//! uploaded batch through validation, persistence and computation.

// Native `async fn` in traits; the returned futures are declared `Send`
// explicitly where the traits need it.
#![allow(async_fn_in_trait)]

pub mod analysis;
pub mod batch;
pub mod error;
pub mod memory;
pub mod reliability;
pub mod run;
pub mod schema;
pub mod store;

pub use error::{ComputationError, SchemaError, ValidationError};

/// A stable key naming one questionnaire item, e.g. `"Q7"`.
pub type ItemId = String;

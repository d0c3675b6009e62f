//! Core types and trait definitions for the Kathmandu transparency service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::TransparencyStore`]; the API and the
//! ingestion job depend only on that abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod agency;
pub mod error;
pub mod filter;
pub mod project;
pub mod report;
pub mod stats;
pub mod store;

pub use error::{Error, FieldError, Result};
pub use filter::{Folded, fold};

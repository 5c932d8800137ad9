//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! quotation engine test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built catalogs, customers and amounts
//! - `builders`: Builders for quotations and for services wired to mock adapters
//! - `assertions`: Custom assertion helpers for ranked quote sets
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;

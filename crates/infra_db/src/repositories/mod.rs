//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and domain
//! types. They return `DatabaseError`; the port adapters in
//! [`crate::adapters`] translate those into `PortError`.
//!
//! Queries are built at runtime with `sqlx::query_as` over `FromRow` types
//! so the crate compiles without a live database.

pub mod catalog;
pub mod quotation;

pub use catalog::CatalogStore;
pub use quotation::QuotationStore;

//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the quotation engine using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] hold the SQL and the row types
//! - [`adapters`] implement the domain ports on top of the repositories
//! - [`pool`] creates the connection pool and applies embedded migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgQuotationRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/quotations")).await?;
//! run_migrations(&pool).await?;
//! let repository = PgQuotationRepository::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PgCatalog, PgQuotationRepository};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use repositories::{CatalogStore, QuotationStore};

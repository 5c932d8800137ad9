//! Domain Adapters
//!
//! Implementations of the quotation domain ports on PostgreSQL.
//!
//! ```rust,ignore
//! use infra_db::adapters::{PgCatalog, PgQuotationRepository};
//! use domain_quotation::QuotationRepository;
//!
//! let repository = PgQuotationRepository::new(pool.clone());
//! let quotation = repository.load(quotation_id).await?;
//! ```

pub mod catalog;
pub mod quotation;

pub use catalog::PgCatalog;
pub use quotation::PgQuotationRepository;

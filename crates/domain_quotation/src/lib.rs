//! Quotation Domain - Multi-insurer motor quotation engine
//!
//! This crate turns a vehicle description into an insured value, prices it
//! with every active insurance company, ranks the offers, and decides when a
//! quotation may be exported or dispatched to the customer.
//!
//! # Key Concepts
//!
//! - **Insured value**: declared vehicle and accessory values, summed exactly
//! - **Company quote**: one insurer's basic and final premium for a quotation
//! - **Ranking**: final premium ascending, company name breaking ties
//! - **Gatekeeper**: export and dispatch preconditions
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_quotation::{QuotationService, GenerateOptions};
//!
//! let outcome = service.generate_quotes(quotation_id, GenerateOptions::default()).await?;
//! println!("{} of {} companies priced", outcome.generated, outcome.attempted);
//! ```

pub mod adapters;
pub mod aggregate;
pub mod catalog;
pub mod company_quote;
pub mod delivery;
pub mod error;
pub mod events;
pub mod generator;
pub mod input;
pub mod insured_value;
pub mod locks;
pub mod ports;
pub mod ranking;
pub mod rating;
pub mod services;
pub mod statistics;

pub use aggregate::{
    DeliveryChannel, DeliveryRecord, FuelType, Quotation, QuotationBuilder, QuotationRecord,
    QuotationState, QuotationUpdate, VehicleDetails,
};
pub use catalog::{AddonCover, Customer, InsuranceCompany};
pub use company_quote::{
    validate_replacement, AddonInput, AddonSelection, CompanyQuote, CompanyQuoteInput,
    PremiumBreakdown,
};
pub use delivery::{
    DeliveryConfirmation, DeliveryGatekeeper, DeliveryReceipt, DispatchMessage, QuotationDocument,
    RenderedDocument,
};
pub use error::{BlockReason, QuotationError, RowError};
pub use events::QuotationEvent;
pub use generator::{GenerationConfig, GenerationReport, QuoteGenerator, SkipReason, SkippedCompany};
pub use insured_value::{compute_from_raw, compute_insured_value, InsuredValue, InsuredValueComponents};
pub use locks::{LockPolicy, QuotationLockGuard, QuotationLocks};
pub use ports::{CatalogPort, DocumentRenderer, MessagingChannel, QuotationRepository, RateModel};
pub use rating::{AddonRate, PolicyType, PricedQuote, PricingRequest, RateCard, RateCardModel};
pub use services::{
    GenerateOptions, GenerationOutcome, NewQuotation, QuotationPorts, QuotationService,
    QuotationServiceConfig, ReplaceOutcome,
};
pub use statistics::{compute_statistics, QuotationStatistics, StatusCounts};

//! Core Kernel - Foundational types for the quotation engine
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Port error types and marker traits for the hexagonal architecture

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{
    QuotationId, CompanyQuoteId, InsuranceCompanyId, AddonCoverId,
    CustomerId, DeliveryId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    CircuitBreakerConfig,
};
pub use error::CoreError;

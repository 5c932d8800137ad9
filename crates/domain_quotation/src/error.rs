//! Quotation domain errors
//!
//! Every operation of the engine reports failures through [`QuotationError`].
//! Validation and not-found failures are raised before any state change.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Why an export or dispatch was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// The quotation has no company quotes to present
    NoCompanyQuotes,
    /// Neither the quotation override nor the customer mobile is set
    NoDestination,
}

impl BlockReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BlockReason::NoCompanyQuotes => "NoCompanyQuotes",
            BlockReason::NoDestination => "NoDestination",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NoCompanyQuotes => write!(f, "quotation has no company quotes"),
            BlockReason::NoDestination => write!(f, "no destination number available"),
        }
    }
}

/// A malformed row in a bulk replace request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// Zero-based index of the row in the request
    pub row: usize,
    /// Offending field, e.g. `final_premium` or `addons[1].premium`
    pub field: String,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}: {}", self.row, self.field, self.message)
    }
}

/// Errors that can occur in the quotation domain
#[derive(Debug, Error)]
pub enum QuotationError {
    /// A numeric or descriptive field was malformed
    #[error("Invalid input for '{field}': {message}")]
    InvalidInput {
        field: String,
        message: String,
    },

    /// One or more rows of a bulk request were malformed
    #[error("Validation failed for {} row(s)", .0.len())]
    Validation(Vec<RowError>),

    /// The quotation, company or customer does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Another mutating operation holds the quotation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Export or dispatch refused
    #[error("Blocked: {0}")]
    Blocked(BlockReason),

    /// A pricing source, renderer or messaging channel failed
    #[error("Upstream unavailable ({service}): {message}")]
    UpstreamUnavailable {
        service: String,
        message: String,
    },

    /// Financial calculation error
    #[error("Financial error: {0}")]
    Money(#[from] MoneyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuotationError {
    /// Creates an invalid input error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        QuotationError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        QuotationError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        QuotationError::Conflict(message.into())
    }

    /// Wraps a collaborator failure, whatever its kind, as upstream unavailability
    pub fn upstream(service: impl Into<String>, error: &PortError) -> Self {
        QuotationError::UpstreamUnavailable {
            service: service.into(),
            message: error.to_string(),
        }
    }

    /// Returns true for failures caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuotationError::InvalidInput { .. }
                | QuotationError::Validation(_)
                | QuotationError::NotFound { .. }
                | QuotationError::Conflict(_)
                | QuotationError::Blocked(_)
        )
    }
}

impl From<PortError> for QuotationError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => QuotationError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => QuotationError::Conflict(message),
            PortError::Validation { message, field } => QuotationError::InvalidInput {
                field: field.unwrap_or_else(|| "request".to_string()),
                message,
            },
            PortError::ServiceUnavailable { ref service } => QuotationError::UpstreamUnavailable {
                service: service.clone(),
                message: error.to_string(),
            },
            PortError::Connection { .. }
            | PortError::Timeout { .. }
            | PortError::RateLimited { .. } => QuotationError::UpstreamUnavailable {
                service: "store".to_string(),
                message: error.to_string(),
            },
            PortError::Rejected { service, message } => {
                QuotationError::UpstreamUnavailable { service, message }
            }
            PortError::Internal { message, .. } => QuotationError::Internal(message),
        }
    }
}

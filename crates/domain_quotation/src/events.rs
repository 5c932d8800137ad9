//! Domain events for the quotation aggregate
//!
//! Events are collected on the aggregate while it changes and drained by the
//! service with [`Quotation::take_events`](crate::Quotation::take_events).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, DeliveryId, QuotationId};

use crate::aggregate::{DeliveryChannel, QuotationState};

/// Domain events emitted by the Quotation aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuotationEvent {
    QuotationCreated {
        quotation_id: QuotationId,
        quote_number: String,
        customer_id: CustomerId,
        timestamp: DateTime<Utc>,
    },

    /// Descriptive fields changed
    QuotationUpdated {
        quotation_id: QuotationId,
        insured_value_changed: bool,
        timestamp: DateTime<Utc>,
    },

    /// The company quote set was replaced wholesale
    CompanyQuotesReplaced {
        quotation_id: QuotationId,
        count: usize,
        state: QuotationState,
        timestamp: DateTime<Utc>,
    },

    QuotationExported {
        quotation_id: QuotationId,
        delivery_id: DeliveryId,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch attempt finished, successfully or not
    QuotationDispatched {
        quotation_id: QuotationId,
        delivery_id: DeliveryId,
        channel: DeliveryChannel,
        succeeded: bool,
        timestamp: DateTime<Utc>,
    },

    QuotationDeleted {
        quotation_id: QuotationId,
        timestamp: DateTime<Utc>,
    },
}

impl QuotationEvent {
    /// Returns the quotation the event belongs to
    pub fn quotation_id(&self) -> QuotationId {
        match self {
            QuotationEvent::QuotationCreated { quotation_id, .. }
            | QuotationEvent::QuotationUpdated { quotation_id, .. }
            | QuotationEvent::CompanyQuotesReplaced { quotation_id, .. }
            | QuotationEvent::QuotationExported { quotation_id, .. }
            | QuotationEvent::QuotationDispatched { quotation_id, .. }
            | QuotationEvent::QuotationDeleted { quotation_id, .. } => *quotation_id,
        }
    }

    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            QuotationEvent::QuotationCreated { .. } => "quotation_created",
            QuotationEvent::QuotationUpdated { .. } => "quotation_updated",
            QuotationEvent::CompanyQuotesReplaced { .. } => "company_quotes_replaced",
            QuotationEvent::QuotationExported { .. } => "quotation_exported",
            QuotationEvent::QuotationDispatched { .. } => "quotation_dispatched",
            QuotationEvent::QuotationDeleted { .. } => "quotation_deleted",
        }
    }
}

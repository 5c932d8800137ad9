//! Delivery Gatekeeper
//!
//! Decides whether a quotation may be exported as a document or dispatched
//! to the customer, and assembles what the renderer and messaging channel
//! receive. The gatekeeper never retries; retry belongs to the channel.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, DeliveryId, QuotationId};

use crate::aggregate::{DeliveryChannel, Quotation, QuotationState, VehicleDetails};
use crate::catalog::Customer;
use crate::company_quote::CompanyQuote;
use crate::error::BlockReason;
use crate::insured_value::InsuredValue;
use crate::rating::PolicyType;

/// Fully populated quotation handed to the document renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationDocument {
    pub quotation_id: QuotationId,
    pub quote_number: String,
    pub customer: Customer,
    pub vehicle: VehicleDetails,
    pub insured_value: InsuredValue,
    pub policy_type: PolicyType,
    pub ncb_percentage: Decimal,
    /// Ranked, cheapest first
    pub company_quotes: Vec<CompanyQuote>,
    pub currency: Currency,
    pub notes: Option<String>,
    pub prepared_at: DateTime<Utc>,
}

/// Binary document produced by the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/pdf".to_string(),
            bytes,
        }
    }
}

/// Payload handed to a messaging channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMessage {
    pub destination: String,
    pub text: String,
    pub document: RenderedDocument,
}

/// Channel acknowledgement of a sent message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub reference: String,
}

/// Result of a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    pub quotation_id: QuotationId,
    pub delivery_id: DeliveryId,
    pub channel: DeliveryChannel,
    pub destination: String,
    pub reference: String,
    pub state: QuotationState,
}

/// Precondition checks for export and dispatch
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryGatekeeper;

impl DeliveryGatekeeper {
    /// Export needs at least one company quote
    pub fn can_export(quotation: &Quotation) -> Result<(), BlockReason> {
        if quotation.has_company_quotes() {
            Ok(())
        } else {
            Err(BlockReason::NoCompanyQuotes)
        }
    }

    /// Dispatch needs company quotes and a destination
    ///
    /// Returns the resolved destination.
    pub fn can_dispatch(
        quotation: &Quotation,
        customer: Option<&Customer>,
        channel: DeliveryChannel,
    ) -> Result<String, BlockReason> {
        Self::can_export(quotation)?;
        match channel {
            DeliveryChannel::WhatsApp => Self::resolve_destination(
                quotation.whatsapp_number(),
                customer.and_then(|c| c.mobile_number.as_deref()),
            )
            .ok_or(BlockReason::NoDestination),
            DeliveryChannel::Document => Ok(String::new()),
        }
    }

    /// First non-blank of the quotation override and the customer mobile
    pub fn resolve_destination(
        override_number: Option<&str>,
        customer_mobile: Option<&str>,
    ) -> Option<String> {
        [override_number, customer_mobile]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|number| !number.is_empty())
            .map(str::to_string)
    }

    /// Assembles the renderer input
    pub fn document(quotation: &Quotation, customer: &Customer) -> QuotationDocument {
        QuotationDocument {
            quotation_id: quotation.id(),
            quote_number: quotation.quote_number().to_string(),
            customer: customer.clone(),
            vehicle: quotation.vehicle().clone(),
            insured_value: *quotation.insured_value(),
            policy_type: quotation.policy_type(),
            ncb_percentage: quotation.ncb_percentage(),
            company_quotes: quotation.company_quotes().to_vec(),
            currency: quotation.currency(),
            notes: quotation.notes().map(str::to_string),
            prepared_at: Utc::now(),
        }
    }

    /// Text accompanying a dispatched document
    pub fn dispatch_text(quotation: &Quotation, customer: &Customer) -> String {
        let offers = quotation.company_quotes().len();
        match quotation.best_quote() {
            Some(best) => format!(
                "Dear {}, your motor insurance quotation {} for {} is ready. \
                 We compared {} insurer{}; the best offer is {} at {}.",
                customer.name,
                quotation.quote_number(),
                quotation.vehicle().make_model,
                offers,
                if offers == 1 { "" } else { "s" },
                best.company_name,
                best.final_premium,
            ),
            None => format!(
                "Dear {}, your motor insurance quotation {} is attached.",
                customer.name,
                quotation.quote_number()
            ),
        }
    }

    /// File name of the exported document
    pub fn file_name(quotation: &Quotation) -> String {
        format!("{}.pdf", quotation.quote_number())
    }
}

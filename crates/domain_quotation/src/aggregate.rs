//! Quotation Aggregate Root
//!
//! The Quotation aggregate is the consistency boundary for one comparison
//! request: the customer and vehicle it is for, the insured value, and the
//! ranked company quotes it owns.
//!
//! # Invariants
//!
//! - The insured value always equals the sum of its breakdown and is never negative
//! - Company quotes carry a positive final premium and contiguous ranks from 1
//! - A company appears at most once in the company quote set
//! - The customer reference never changes after creation

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use core_kernel::{AddonCoverId, Currency, CustomerId, DeliveryId, QuotationId};

use crate::company_quote::CompanyQuote;
use crate::error::QuotationError;
use crate::events::QuotationEvent;
use crate::insured_value::{compute_insured_value, InsuredValue, InsuredValueComponents};
use crate::ranking;
use crate::rating::PolicyType;

/// Quotation lifecycle states
///
/// ```text
/// Draft --replace(non-empty)--> Quoted --dispatch ok--> Sent
///   ^                             |                      |
///   +------replace(empty)---------+----------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationState {
    /// No company quotes yet
    Draft,
    /// At least one company quote
    Quoted,
    /// The current quotes were dispatched to the customer
    Sent,
}

impl QuotationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationState::Draft => "draft",
            QuotationState::Quoted => "quoted",
            QuotationState::Sent => "sent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(QuotationState::Draft),
            "quoted" => Some(QuotationState::Quoted),
            "sent" => Some(QuotationState::Sent),
            _ => None,
        }
    }
}

impl fmt::Display for QuotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    #[default]
    Petrol,
    Diesel,
    Cng,
    Electric,
    Hybrid,
    Lpg,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
            FuelType::Cng => "cng",
            FuelType::Electric => "electric",
            FuelType::Hybrid => "hybrid",
            FuelType::Lpg => "lpg",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "petrol" => Some(FuelType::Petrol),
            "diesel" => Some(FuelType::Diesel),
            "cng" => Some(FuelType::Cng),
            "electric" => Some(FuelType::Electric),
            "hybrid" => Some(FuelType::Hybrid),
            "lpg" => Some(FuelType::Lpg),
            _ => None,
        }
    }
}

/// The vehicle being insured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub registration_number: Option<String>,
    pub make_model: String,
    pub variant: Option<String>,
    pub fuel_type: FuelType,
    pub manufacturing_year: Option<i32>,
    /// Regional transport office of registration
    pub rto_location: Option<String>,
}

impl VehicleDetails {
    pub fn new(make_model: impl Into<String>, fuel_type: FuelType) -> Self {
        Self {
            registration_number: None,
            make_model: make_model.into(),
            variant: None,
            fuel_type,
            manufacturing_year: None,
            rto_location: None,
        }
    }

    pub fn validate(&self) -> Result<(), QuotationError> {
        if self.make_model.trim().is_empty() {
            return Err(QuotationError::invalid_input("vehicle.make_model", "is required"));
        }
        if let Some(year) = self.manufacturing_year {
            let latest = Utc::now().year() + 1;
            if !(1900..=latest).contains(&year) {
                return Err(QuotationError::invalid_input(
                    "vehicle.manufacturing_year",
                    format!("must be between 1900 and {}", latest),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    /// Document export
    Document,
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Document => "document",
            DeliveryChannel::WhatsApp => "whatsapp",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "document" => Some(DeliveryChannel::Document),
            "whatsapp" => Some(DeliveryChannel::WhatsApp),
            _ => None,
        }
    }
}

/// Outcome of one export or dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: DeliveryId,
    pub channel: DeliveryChannel,
    pub destination: Option<String>,
    pub succeeded: bool,
    /// Reference returned by the channel
    pub reference: Option<String>,
    pub failure_reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn succeeded(
        channel: DeliveryChannel,
        destination: Option<String>,
        reference: Option<String>,
    ) -> Self {
        Self {
            id: DeliveryId::new_v7(),
            channel,
            destination,
            succeeded: true,
            reference,
            failure_reason: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(
        channel: DeliveryChannel,
        destination: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: DeliveryId::new_v7(),
            channel,
            destination,
            succeeded: false,
            reference: None,
            failure_reason: Some(reason.into()),
            recorded_at: Utc::now(),
        }
    }
}

/// Changes to the descriptive fields of a quotation
///
/// `None` leaves a field unchanged. An empty `whatsapp_number` or `notes`
/// clears the field.
#[derive(Debug, Clone, Default)]
pub struct QuotationUpdate {
    pub vehicle: Option<VehicleDetails>,
    pub components: Option<InsuredValueComponents>,
    pub whatsapp_number: Option<String>,
    pub addon_ids: Option<Vec<AddonCoverId>>,
    pub policy_type: Option<PolicyType>,
    pub ncb_percentage: Option<Decimal>,
    pub notes: Option<String>,
}

impl QuotationUpdate {
    pub fn is_empty(&self) -> bool {
        self.vehicle.is_none()
            && self.components.is_none()
            && self.whatsapp_number.is_none()
            && self.addon_ids.is_none()
            && self.policy_type.is_none()
            && self.ncb_percentage.is_none()
            && self.notes.is_none()
    }
}

/// Persisted form of a quotation, used by repositories to rebuild the aggregate
#[derive(Debug, Clone)]
pub struct QuotationRecord {
    pub id: QuotationId,
    pub quote_number: String,
    pub customer_id: CustomerId,
    pub vehicle: VehicleDetails,
    pub insured_value: InsuredValue,
    pub whatsapp_number: Option<String>,
    pub addon_ids: Vec<AddonCoverId>,
    pub policy_type: PolicyType,
    pub ncb_percentage: Decimal,
    pub notes: Option<String>,
    pub state: QuotationState,
    pub company_quotes: Vec<CompanyQuote>,
    pub deliveries: Vec<DeliveryRecord>,
    pub currency: Currency,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The Quotation aggregate root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    id: QuotationId,
    /// Human-readable number, `QT-YYYYMM-NNNNNN`
    quote_number: String,
    customer_id: CustomerId,
    vehicle: VehicleDetails,
    insured_value: InsuredValue,
    /// Overrides the customer's mobile number for dispatch
    whatsapp_number: Option<String>,
    addon_ids: Vec<AddonCoverId>,
    policy_type: PolicyType,
    ncb_percentage: Decimal,
    notes: Option<String>,
    state: QuotationState,
    /// Ranked, cheapest first
    company_quotes: Vec<CompanyQuote>,
    deliveries: Vec<DeliveryRecord>,
    currency: Currency,
    #[serde(skip)]
    events: Vec<QuotationEvent>,
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Quotation {
    /// Rebuilds an aggregate from its persisted form
    ///
    /// Company quotes are re-ranked so a stored set always reads back in
    /// ranking order.
    pub fn restore(record: QuotationRecord) -> Self {
        let state = match (record.state, record.company_quotes.is_empty()) {
            (_, true) => QuotationState::Draft,
            (QuotationState::Draft, false) => QuotationState::Quoted,
            (state, false) => state,
        };
        Self {
            id: record.id,
            quote_number: record.quote_number,
            customer_id: record.customer_id,
            vehicle: record.vehicle,
            insured_value: record.insured_value,
            whatsapp_number: record.whatsapp_number,
            addon_ids: record.addon_ids,
            policy_type: record.policy_type,
            ncb_percentage: record.ncb_percentage,
            notes: record.notes,
            state,
            company_quotes: ranking::rank(record.company_quotes),
            deliveries: record.deliveries,
            currency: record.currency,
            events: Vec::new(),
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn id(&self) -> QuotationId {
        self.id
    }

    pub fn quote_number(&self) -> &str {
        &self.quote_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn vehicle(&self) -> &VehicleDetails {
        &self.vehicle
    }

    pub fn insured_value(&self) -> &InsuredValue {
        &self.insured_value
    }

    pub fn whatsapp_number(&self) -> Option<&str> {
        self.whatsapp_number.as_deref()
    }

    pub fn addon_ids(&self) -> &[AddonCoverId] {
        &self.addon_ids
    }

    pub fn policy_type(&self) -> PolicyType {
        self.policy_type
    }

    pub fn ncb_percentage(&self) -> Decimal {
        self.ncb_percentage
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn state(&self) -> QuotationState {
        self.state
    }

    /// Company quotes in rank order
    pub fn company_quotes(&self) -> &[CompanyQuote] {
        &self.company_quotes
    }

    pub fn deliveries(&self) -> &[DeliveryRecord] {
        &self.deliveries
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn has_company_quotes(&self) -> bool {
        !self.company_quotes.is_empty()
    }

    /// The rank-1 quote
    pub fn best_quote(&self) -> Option<&CompanyQuote> {
        self.company_quotes.first()
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<QuotationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Replaces the whole company quote set
    ///
    /// The new set is validated and ranked before anything changes. An empty
    /// set moves the quotation to `Draft`; any other set to `Quoted`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if a quote breaks a premium invariant or a company
    /// appears twice.
    pub fn replace_company_quotes(&mut self, quotes: Vec<CompanyQuote>) -> Result<(), QuotationError> {
        let mut companies = HashSet::with_capacity(quotes.len());
        for quote in &quotes {
            quote.validate()?;
            if quote.final_premium.currency() != self.currency {
                return Err(QuotationError::invalid_input(
                    "final_premium",
                    format!(
                        "expected {} but {} quoted in {}",
                        self.currency,
                        quote.company_name,
                        quote.final_premium.currency()
                    ),
                ));
            }
            if !companies.insert(quote.company_id) {
                return Err(QuotationError::invalid_input(
                    "company_id",
                    format!("{} appears more than once", quote.company_name),
                ));
            }
        }

        let ranked = ranking::rank(quotes);
        let now = Utc::now();

        self.state = if ranked.is_empty() {
            QuotationState::Draft
        } else {
            QuotationState::Quoted
        };
        self.company_quotes = ranked;
        self.version += 1;
        self.updated_at = now;

        self.events.push(QuotationEvent::CompanyQuotesReplaced {
            quotation_id: self.id,
            count: self.company_quotes.len(),
            state: self.state,
            timestamp: now,
        });

        Ok(())
    }

    /// Applies descriptive changes
    ///
    /// Returns true when the insured value was recomputed. Existing company
    /// quotes are kept as they are.
    pub fn apply_update(&mut self, update: QuotationUpdate) -> Result<bool, QuotationError> {
        if let Some(vehicle) = &update.vehicle {
            vehicle.validate()?;
        }
        if let Some(ncb) = update.ncb_percentage {
            validate_ncb(ncb)?;
        }
        let insured_value = match &update.components {
            Some(components) => Some(compute_insured_value(components, self.currency)?),
            None => None,
        };

        let insured_value_changed = insured_value
            .map(|value| value != self.insured_value)
            .unwrap_or(false);

        if let Some(vehicle) = update.vehicle {
            self.vehicle = vehicle;
        }
        if let Some(value) = insured_value {
            self.insured_value = value;
        }
        if let Some(number) = update.whatsapp_number {
            self.whatsapp_number = normalize_optional(Some(number));
        }
        if let Some(addon_ids) = update.addon_ids {
            self.addon_ids = dedup_addons(addon_ids);
        }
        if let Some(policy_type) = update.policy_type {
            self.policy_type = policy_type;
        }
        if let Some(ncb) = update.ncb_percentage {
            self.ncb_percentage = ncb;
        }
        if let Some(notes) = update.notes {
            self.notes = normalize_optional(Some(notes));
        }

        let now = Utc::now();
        self.version += 1;
        self.updated_at = now;

        self.events.push(QuotationEvent::QuotationUpdated {
            quotation_id: self.id,
            insured_value_changed,
            timestamp: now,
        });

        Ok(insured_value_changed)
    }

    /// Appends a delivery attempt to the log
    ///
    /// A successful dispatch moves the quotation to `Sent`.
    pub fn record_delivery(&mut self, record: DeliveryRecord) {
        let now = Utc::now();
        let event = match record.channel {
            DeliveryChannel::Document => QuotationEvent::QuotationExported {
                quotation_id: self.id,
                delivery_id: record.id,
                timestamp: now,
            },
            channel => QuotationEvent::QuotationDispatched {
                quotation_id: self.id,
                delivery_id: record.id,
                channel,
                succeeded: record.succeeded,
                timestamp: now,
            },
        };

        if record.succeeded && record.channel == DeliveryChannel::WhatsApp && self.has_company_quotes() {
            self.state = QuotationState::Sent;
        }
        self.deliveries.push(record);
        self.updated_at = now;
        self.events.push(event);
    }

    /// Installs a company quote set as a store commits it
    pub(crate) fn install_company_quotes(&mut self, quotes: Vec<CompanyQuote>, state: QuotationState) {
        self.company_quotes = ranking::rank(quotes);
        self.state = if self.company_quotes.is_empty() {
            QuotationState::Draft
        } else {
            state
        };
        self.updated_at = Utc::now();
    }

    /// Takes over the children a store owns separately from the header
    pub(crate) fn install_persisted_children(&mut self, stored: &Quotation) {
        self.company_quotes = stored.company_quotes.clone();
        self.deliveries = stored.deliveries.clone();
        self.state = stored.state;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Appends a delivery record as a store commits it
    pub(crate) fn install_delivery(&mut self, record: DeliveryRecord, state: Option<QuotationState>) {
        self.deliveries.push(record);
        if let Some(state) = state {
            self.state = state;
        }
        self.updated_at = Utc::now();
    }

    /// Records the deletion event before the aggregate is dropped
    pub fn mark_deleted(&mut self) {
        self.events.push(QuotationEvent::QuotationDeleted {
            quotation_id: self.id,
            timestamp: Utc::now(),
        });
    }
}

fn validate_ncb(ncb: Decimal) -> Result<(), QuotationError> {
    if ncb < Decimal::ZERO || ncb > dec!(100) {
        return Err(QuotationError::invalid_input(
            "ncb_percentage",
            "must be between 0 and 100",
        ));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn dedup_addons(addon_ids: Vec<AddonCoverId>) -> Vec<AddonCoverId> {
    let mut seen = HashSet::new();
    addon_ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Builder for creating new quotations
///
/// # Example
///
/// ```rust,ignore
/// let quotation = QuotationBuilder::new()
///     .customer(customer_id)
///     .vehicle(VehicleDetails::new("Maruti Swift", FuelType::Petrol))
///     .components(InsuredValueComponents::vehicle_only(dec!(500000)))
///     .build()?;
/// ```
pub struct QuotationBuilder {
    customer_id: Option<CustomerId>,
    vehicle: Option<VehicleDetails>,
    components: Option<InsuredValueComponents>,
    currency: Currency,
    whatsapp_number: Option<String>,
    addon_ids: Vec<AddonCoverId>,
    policy_type: PolicyType,
    ncb_percentage: Decimal,
    notes: Option<String>,
}

impl QuotationBuilder {
    pub fn new() -> Self {
        Self {
            customer_id: None,
            vehicle: None,
            components: None,
            currency: Currency::INR,
            whatsapp_number: None,
            addon_ids: Vec::new(),
            policy_type: PolicyType::Comprehensive,
            ncb_percentage: Decimal::ZERO,
            notes: None,
        }
    }

    pub fn customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn vehicle(mut self, vehicle: VehicleDetails) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn components(mut self, components: InsuredValueComponents) -> Self {
        self.components = Some(components);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn whatsapp_number(mut self, number: impl Into<String>) -> Self {
        self.whatsapp_number = Some(number.into());
        self
    }

    pub fn addons(mut self, addon_ids: Vec<AddonCoverId>) -> Self {
        self.addon_ids = addon_ids;
        self
    }

    pub fn policy_type(mut self, policy_type: PolicyType) -> Self {
        self.policy_type = policy_type;
        self
    }

    pub fn ncb_percentage(mut self, ncb: Decimal) -> Self {
        self.ncb_percentage = ncb;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builds the quotation in `Draft`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if a required field is missing or a value is out of range
    pub fn build(self) -> Result<Quotation, QuotationError> {
        let customer_id = self
            .customer_id
            .ok_or_else(|| QuotationError::invalid_input("customer_id", "is required"))?;
        let vehicle = self
            .vehicle
            .ok_or_else(|| QuotationError::invalid_input("vehicle", "is required"))?;
        let components = self
            .components
            .ok_or_else(|| QuotationError::invalid_input("components", "is required"))?;

        vehicle.validate()?;
        validate_ncb(self.ncb_percentage)?;
        let insured_value = compute_insured_value(&components, self.currency)?;

        let now = Utc::now();
        let id = QuotationId::new_v7();
        let quote_number = generate_quote_number(id, now);

        Ok(Quotation {
            id,
            quote_number: quote_number.clone(),
            customer_id,
            vehicle,
            insured_value,
            whatsapp_number: normalize_optional(self.whatsapp_number),
            addon_ids: dedup_addons(self.addon_ids),
            policy_type: self.policy_type,
            ncb_percentage: self.ncb_percentage,
            notes: normalize_optional(self.notes),
            state: QuotationState::Draft,
            company_quotes: Vec::new(),
            deliveries: Vec::new(),
            currency: self.currency,
            events: vec![QuotationEvent::QuotationCreated {
                quotation_id: id,
                quote_number,
                customer_id,
                timestamp: now,
            }],
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Default for QuotationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a quote number
///
/// Format: QT-{YEAR}{MONTH}-{SUFFIX}, where the suffix is the last 48 random
/// bits of the v7 id in upper hex.
fn generate_quote_number(id: QuotationId, now: DateTime<Utc>) -> String {
    let bytes = id.as_uuid().as_bytes();
    let suffix = bytes[10..]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    format!("QT-{}-{:012X}", now.format("%Y%m"), suffix)
}

//! Company quotes
//!
//! A [`CompanyQuote`] is one insurer's priced offer within a quotation. It is
//! owned by the quotation and replaced wholesale with the rest of the set.
//! Bulk replace input arrives as loosely typed [`CompanyQuoteInput`] rows that
//! are validated together before anything is mutated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use core_kernel::{AddonCoverId, CompanyQuoteId, Currency, InsuranceCompanyId, Money};

use crate::catalog::{AddonCover, InsuranceCompany};
use crate::error::{QuotationError, RowError};
use crate::input::{parse_amount, parse_non_negative};

/// An addon cover priced by one company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSelection {
    pub addon_id: AddonCoverId,
    pub name: String,
    pub premium: Money,
}

/// Component premiums behind a final premium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    pub own_damage: Money,
    pub ncb_discount: Money,
    pub third_party: Money,
    pub addons: Money,
    pub net: Money,
    pub gst: Money,
}

/// One insurer's premium offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyQuote {
    pub id: CompanyQuoteId,
    pub company_id: InsuranceCompanyId,
    /// Company name when the quote was made, used as the ranking tie-break
    pub company_name: String,
    pub basic_premium: Money,
    pub final_premium: Money,
    /// 1-based position among the quotation's quotes, 0 until ranked
    pub rank: u32,
    #[serde(default)]
    pub addons: Vec<AddonSelection>,
    #[serde(default)]
    pub breakdown: Option<PremiumBreakdown>,
    /// Insured value the company priced against
    #[serde(default)]
    pub insured_value: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl CompanyQuote {
    /// Creates an unranked quote
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the basic premium is negative or the final premium
    /// is not strictly positive.
    pub fn new(
        company: &InsuranceCompany,
        basic_premium: Money,
        final_premium: Money,
    ) -> Result<Self, QuotationError> {
        let quote = Self {
            id: CompanyQuoteId::new_v7(),
            company_id: company.id,
            company_name: company.name.clone(),
            basic_premium,
            final_premium,
            rank: 0,
            addons: Vec::new(),
            breakdown: None,
            insured_value: None,
            created_at: Utc::now(),
        };
        quote.validate()?;
        Ok(quote)
    }

    pub fn with_addons(mut self, addons: Vec<AddonSelection>) -> Self {
        self.addons = addons;
        self
    }

    pub fn with_breakdown(mut self, breakdown: PremiumBreakdown) -> Self {
        self.breakdown = Some(breakdown);
        self
    }

    pub fn with_insured_value(mut self, insured_value: Money) -> Self {
        self.insured_value = Some(insured_value);
        self
    }

    /// Total of the addon premiums
    pub fn addon_premium(&self) -> Result<Money, QuotationError> {
        let premiums: Vec<Money> = self.addons.iter().map(|a| a.premium).collect();
        Ok(Money::sum(&premiums, self.final_premium.currency())?)
    }

    /// True for the cheapest offer of the quotation
    pub fn is_best(&self) -> bool {
        self.rank == 1
    }

    /// Checks the premium invariants
    pub fn validate(&self) -> Result<(), QuotationError> {
        if !self.final_premium.is_positive() {
            return Err(QuotationError::invalid_input(
                "final_premium",
                format!("must be greater than zero for {}", self.company_name),
            ));
        }
        if self.basic_premium.is_negative() {
            return Err(QuotationError::invalid_input(
                "basic_premium",
                format!("must not be negative for {}", self.company_name),
            ));
        }
        if self.addons.iter().any(|a| a.premium.is_negative()) {
            return Err(QuotationError::invalid_input(
                "addons",
                format!("addon premiums must not be negative for {}", self.company_name),
            ));
        }
        Ok(())
    }
}

/// One row of a bulk replace request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyQuoteInput {
    pub company_id: InsuranceCompanyId,
    #[serde(default)]
    pub basic_premium: Value,
    /// Absent or `null` marks an unpriced placeholder row
    #[serde(default)]
    pub final_premium: Value,
    #[serde(default)]
    pub addons: Vec<AddonInput>,
}

/// Addon premium within a replace row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonInput {
    pub addon_id: AddonCoverId,
    #[serde(default)]
    pub premium: Value,
}

/// Validates replace rows against the catalog
///
/// Every row is checked before a result is returned, so the caller either
/// gets the complete new set or an error listing every malformed row.
/// Placeholder rows (no final premium) are dropped.
///
/// # Errors
///
/// - `NotFound` when a row names a company missing from the catalog
/// - `Validation` listing each malformed row
pub fn validate_replacement(
    rows: &[CompanyQuoteInput],
    companies: &[InsuranceCompany],
    addons: &[AddonCover],
    currency: Currency,
) -> Result<Vec<CompanyQuote>, QuotationError> {
    let company_index: HashMap<InsuranceCompanyId, &InsuranceCompany> =
        companies.iter().map(|c| (c.id, c)).collect();
    let addon_index: HashMap<AddonCoverId, (usize, &AddonCover)> = addons
        .iter()
        .enumerate()
        .map(|(position, a)| (a.id, (position, a)))
        .collect();

    if let Some(row) = rows.iter().find(|r| !company_index.contains_key(&r.company_id)) {
        return Err(QuotationError::not_found("InsuranceCompany", row.company_id));
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut quotes = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let company = company_index[&row.company_id];

        let final_premium = match parse_amount("final_premium", &row.final_premium) {
            Ok(Some(amount)) => amount,
            Ok(None) => continue,
            Err(err) => {
                errors.push(row_error(index, err));
                continue;
            }
        };

        let mut row_valid = true;

        if !seen.insert(row.company_id) {
            errors.push(RowError::new(index, "company_id", "company appears more than once"));
            row_valid = false;
        }

        let final_premium = Money::new(final_premium, currency).round_to_currency();
        if !final_premium.is_positive() {
            errors.push(RowError::new(index, "final_premium", "must be greater than zero"));
            row_valid = false;
        }

        let basic_premium = match parse_non_negative("basic_premium", &row.basic_premium) {
            Ok(amount) => amount.unwrap_or_default(),
            Err(err) => {
                errors.push(row_error(index, err));
                row_valid = false;
                Decimal::ZERO
            }
        };

        let mut selections = Vec::with_capacity(row.addons.len());
        for (addon_index_in_row, addon) in row.addons.iter().enumerate() {
            let field = format!("addons[{}]", addon_index_in_row);
            let Some((position, cover)) = addon_index.get(&addon.addon_id) else {
                errors.push(RowError::new(index, format!("{}.addon_id", field), "unknown addon cover"));
                row_valid = false;
                continue;
            };
            match parse_non_negative(&format!("{}.premium", field), &addon.premium) {
                Ok(premium) => selections.push((
                    *position,
                    AddonSelection {
                        addon_id: cover.id,
                        name: cover.name.clone(),
                        premium: Money::new(premium.unwrap_or_default(), currency)
                            .round_to_currency(),
                    },
                )),
                Err(err) => {
                    errors.push(row_error(index, err));
                    row_valid = false;
                }
            }
        }

        if !row_valid {
            continue;
        }

        selections.sort_by_key(|(position, _)| *position);
        let quote = CompanyQuote::new(
            company,
            Money::new(basic_premium, currency).round_to_currency(),
            final_premium,
        )
        .map_err(|err| QuotationError::Internal(err.to_string()))?
        .with_addons(selections.into_iter().map(|(_, s)| s).collect());
        quotes.push(quote);
    }

    if !errors.is_empty() {
        return Err(QuotationError::Validation(errors));
    }
    Ok(quotes)
}

fn row_error(row: usize, err: QuotationError) -> RowError {
    match err {
        QuotationError::InvalidInput { field, message } => RowError::new(row, field, message),
        other => RowError::new(row, "row", other.to_string()),
    }
}

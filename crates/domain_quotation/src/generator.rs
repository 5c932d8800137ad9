//! Company quote generation
//!
//! Fans a pricing request out to every active company, waits for all of them
//! (each within its own timeout) and turns the answers into a ranked set of
//! company quotes. A company that cannot be priced is skipped and reported;
//! it never fails the round.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{InsuranceCompanyId, PortError};

use crate::catalog::InsuranceCompany;
use crate::company_quote::CompanyQuote;
use crate::ports::RateModel;
use crate::ranking;
use crate::rating::{PricedQuote, PricingRequest};

/// Generation settings
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    /// Upper bound for one company's pricing call
    pub pricing_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            pricing_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Why a company is missing from a generated set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The pricing source failed or has nothing for the company
    Unavailable,
    /// The pricing call exceeded the timeout
    TimedOut,
    /// The priced final premium was not positive
    InvalidPremium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCompany {
    pub company_id: InsuranceCompanyId,
    pub company_name: String,
    pub reason: SkipReason,
    pub message: String,
}

/// Outcome of one pricing round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Ranked, cheapest first
    pub quotes: Vec<CompanyQuote>,
    /// Companies asked for a price
    pub attempted: usize,
    pub skipped: Vec<SkippedCompany>,
}

impl GenerationReport {
    /// Number of companies that produced a quote
    pub fn generated(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

enum Priced {
    Quote(CompanyQuote),
    Skipped(SkippedCompany),
}

/// Orchestrates the per-company rate model calls
pub struct QuoteGenerator {
    rate_model: Arc<dyn RateModel>,
    config: GenerationConfig,
}

impl QuoteGenerator {
    pub fn new(rate_model: Arc<dyn RateModel>, config: GenerationConfig) -> Self {
        Self { rate_model, config }
    }

    pub fn config(&self) -> GenerationConfig {
        self.config
    }

    /// Prices every company in `companies` concurrently and ranks the results
    ///
    /// Inactive companies are ignored and not counted as attempted.
    pub async fn generate(
        &self,
        companies: &[InsuranceCompany],
        request: &PricingRequest,
    ) -> GenerationReport {
        let active: Vec<&InsuranceCompany> = companies.iter().filter(|c| c.is_active).collect();
        let attempted = active.len();

        let results = join_all(active.into_iter().map(|company| self.price_one(company, request))).await;

        let mut quotes = Vec::with_capacity(attempted);
        let mut skipped = Vec::new();
        for result in results {
            match result {
                Priced::Quote(quote) => quotes.push(quote),
                Priced::Skipped(skip) => skipped.push(skip),
            }
        }

        let quotes = ranking::rank(quotes);

        tracing::info!(
            quotation_id = %request.quotation_id,
            attempted,
            generated = quotes.len(),
            skipped = skipped.len(),
            "pricing round finished"
        );

        GenerationReport {
            quotes,
            attempted,
            skipped,
        }
    }

    async fn price_one(&self, company: &InsuranceCompany, request: &PricingRequest) -> Priced {
        let timeout = self.config.pricing_timeout;
        let outcome = tokio::time::timeout(timeout, self.rate_model.price(company, request)).await;

        let skip = |reason: SkipReason, message: String| {
            tracing::warn!(
                quotation_id = %request.quotation_id,
                company_id = %company.id,
                company = %company.name,
                ?reason,
                %message,
                "company skipped"
            );
            Priced::Skipped(SkippedCompany {
                company_id: company.id,
                company_name: company.name.clone(),
                reason,
                message,
            })
        };

        match outcome {
            Err(_) => skip(
                SkipReason::TimedOut,
                format!("no answer within {}ms", timeout.as_millis()),
            ),
            Ok(Err(error)) => skip(SkipReason::Unavailable, describe(&error)),
            Ok(Ok(priced)) => match to_company_quote(company, request, priced) {
                Ok(quote) => Priced::Quote(quote),
                Err(message) => skip(SkipReason::InvalidPremium, message),
            },
        }
    }
}

fn describe(error: &PortError) -> String {
    match error {
        PortError::ServiceUnavailable { service } => format!("{} unavailable", service),
        other => other.to_string(),
    }
}

fn to_company_quote(
    company: &InsuranceCompany,
    request: &PricingRequest,
    priced: PricedQuote,
) -> Result<CompanyQuote, String> {
    let quote = CompanyQuote::new(company, priced.basic_premium, priced.final_premium)
        .map_err(|e| e.to_string())?
        .with_addons(priced.addons)
        .with_insured_value(request.insured_value);

    let quote = match priced.breakdown {
        Some(breakdown) => quote.with_breakdown(breakdown),
        None => quote,
    };
    quote.validate().map_err(|e| e.to_string())?;
    Ok(quote)
}

//! Rate cards
//!
//! Insurer pricing is external data. A [`RateCard`] carries the figures one
//! company publishes (own-damage rate, third-party premium, addon rates, GST)
//! and [`RateCardModel`] applies them with a fixed motor premium formula:
//!
//! ```text
//! od     = IDV × od_rate            (0 for third-party-only cover)
//! ncb    = od × ncb%
//! tp     = third-party premium      (0 for own-damage-only cover)
//! addons = Σ IDV × addon_rate
//! basic  = od − ncb + tp
//! net    = basic + addons
//! gst    = net × gst_rate
//! final  = net + gst
//! ```
//!
//! Intermediate figures stay exact; each reported amount is rounded once.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use core_kernel::{
    AddonCoverId, DomainPort, HealthCheckResult, HealthCheckable, InsuranceCompanyId, Money,
    MoneyError, PortError, QuotationId, Rate,
};

use crate::catalog::{AddonCover, InsuranceCompany};
use crate::company_quote::{AddonSelection, PremiumBreakdown};
use crate::error::QuotationError;
use crate::ports::RateModel;

/// Scope of the motor policy being quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Own damage and third-party liability
    #[default]
    Comprehensive,
    ThirdPartyOnly,
    OwnDamageOnly,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Comprehensive => "comprehensive",
            PolicyType::ThirdPartyOnly => "third_party_only",
            PolicyType::OwnDamageOnly => "own_damage_only",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "comprehensive" => Some(PolicyType::Comprehensive),
            "third_party_only" => Some(PolicyType::ThirdPartyOnly),
            "own_damage_only" => Some(PolicyType::OwnDamageOnly),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a company is asked to price
#[derive(Debug, Clone)]
pub struct PricingRequest {
    pub quotation_id: QuotationId,
    pub insured_value: Money,
    /// Selected covers in catalog display order
    pub addons: Vec<AddonCover>,
    pub policy_type: PolicyType,
    pub ncb_percentage: Decimal,
}

/// A company's answer to a pricing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedQuote {
    pub basic_premium: Money,
    pub final_premium: Money,
    pub addons: Vec<AddonSelection>,
    pub breakdown: Option<PremiumBreakdown>,
}

/// Addon rate published by one company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonRate {
    pub addon_id: AddonCoverId,
    /// Percentage of the insured value
    pub rate_percent: Decimal,
}

fn default_gst_rate() -> Decimal {
    dec!(18)
}

/// One company's pricing figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    pub company_id: InsuranceCompanyId,
    /// Percentage of the insured value
    pub own_damage_rate_percent: Decimal,
    pub third_party_premium: Decimal,
    #[serde(default)]
    pub addon_rates: Vec<AddonRate>,
    #[serde(default = "default_gst_rate")]
    pub gst_rate_percent: Decimal,
}

impl RateCard {
    fn addon_rate(&self, addon_id: AddonCoverId) -> Option<Rate> {
        self.addon_rates
            .iter()
            .find(|r| r.addon_id == addon_id)
            .map(|r| Rate::from_percentage(r.rate_percent))
    }

    /// Prices a request with this card
    pub fn price(&self, request: &PricingRequest) -> Result<PricedQuote, MoneyError> {
        let currency = request.insured_value.currency();
        let idv = request.insured_value;
        let zero = Money::zero(currency);

        let own_damage = match request.policy_type {
            PolicyType::ThirdPartyOnly => zero,
            _ => Rate::from_percentage(self.own_damage_rate_percent).apply(&idv)?,
        };
        let ncb_discount = Rate::from_percentage(request.ncb_percentage).apply(&own_damage)?;
        let third_party = match request.policy_type {
            PolicyType::OwnDamageOnly => zero,
            _ => Money::new(self.third_party_premium, currency),
        };

        let mut selections = Vec::new();
        let mut addon_total = zero;
        for cover in &request.addons {
            let Some(rate) = self.addon_rate(cover.id) else {
                continue;
            };
            let premium = rate.apply(&idv)?;
            addon_total = addon_total.checked_add(&premium)?;
            selections.push(AddonSelection {
                addon_id: cover.id,
                name: cover.name.clone(),
                premium: premium.round_to_currency(),
            });
        }

        let basic = own_damage.checked_sub(&ncb_discount)?.checked_add(&third_party)?;
        let net = basic.checked_add(&addon_total)?;
        let gst = Rate::from_percentage(self.gst_rate_percent).apply(&net)?;
        let final_premium = net.checked_add(&gst)?;

        Ok(PricedQuote {
            basic_premium: basic.round_to_currency(),
            final_premium: final_premium.round_to_currency(),
            addons: selections,
            breakdown: Some(PremiumBreakdown {
                own_damage: own_damage.round_to_currency(),
                ncb_discount: ncb_discount.round_to_currency(),
                third_party: third_party.round_to_currency(),
                addons: addon_total.round_to_currency(),
                net: net.round_to_currency(),
                gst: gst.round_to_currency(),
            }),
        })
    }
}

/// Rate model backed by a set of rate cards
#[derive(Debug, Clone, Default)]
pub struct RateCardModel {
    cards: HashMap<InsuranceCompanyId, RateCard>,
}

impl RateCardModel {
    pub fn new(cards: Vec<RateCard>) -> Self {
        Self {
            cards: cards.into_iter().map(|c| (c.company_id, c)).collect(),
        }
    }

    /// Parses a JSON array of rate cards
    pub fn from_json(json: &str) -> Result<Self, QuotationError> {
        let cards: Vec<RateCard> = serde_json::from_str(json)
            .map_err(|e| QuotationError::invalid_input("rate_cards", e.to_string()))?;
        Ok(Self::new(cards))
    }

    /// Loads rate cards from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuotationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            QuotationError::Internal(format!("cannot read rate cards {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl DomainPort for RateCardModel {}

#[async_trait]
impl HealthCheckable for RateCardModel {
    async fn health_check(&self) -> HealthCheckResult {
        let mut result = HealthCheckResult::healthy("rate-card-model");
        result.message = Some(format!("{} rate cards loaded", self.cards.len()));
        result
    }
}

#[async_trait]
impl RateModel for RateCardModel {
    async fn price(
        &self,
        company: &InsuranceCompany,
        request: &PricingRequest,
    ) -> Result<PricedQuote, PortError> {
        let card = self
            .cards
            .get(&company.id)
            .ok_or_else(|| PortError::unavailable(format!("rate card for {}", company.name)))?;
        card.price(request)
            .map_err(|e| PortError::internal(format!("pricing {} failed: {}", company.name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn zero_dep() -> AddonCover {
        AddonCover::new("Zero Depreciation", 1)
    }

    fn card(company: &InsuranceCompany, addon: &AddonCover) -> RateCard {
        RateCard {
            company_id: company.id,
            own_damage_rate_percent: dec!(2),
            third_party_premium: dec!(2094),
            addon_rates: vec![AddonRate {
                addon_id: addon.id,
                rate_percent: dec!(0.4),
            }],
            gst_rate_percent: dec!(18),
        }
    }

    fn request(addons: Vec<AddonCover>, policy_type: PolicyType) -> PricingRequest {
        PricingRequest {
            quotation_id: QuotationId::new(),
            insured_value: Money::new(dec!(520000), Currency::INR),
            addons,
            policy_type,
            ncb_percentage: dec!(20),
        }
    }

    #[test]
    fn test_comprehensive_formula() {
        let company = InsuranceCompany::new("Acme General");
        let addon = zero_dep();
        let priced = card(&company, &addon)
            .price(&request(vec![addon.clone()], PolicyType::Comprehensive))
            .unwrap();

        let breakdown = priced.breakdown.unwrap();
        assert_eq!(breakdown.own_damage.amount(), dec!(10400));
        assert_eq!(breakdown.ncb_discount.amount(), dec!(2080));
        assert_eq!(priced.basic_premium.amount(), dec!(10414));
        assert_eq!(breakdown.addons.amount(), dec!(2080));
        assert_eq!(breakdown.net.amount(), dec!(12494));
        assert_eq!(breakdown.gst.amount(), dec!(2248.92));
        assert_eq!(priced.final_premium.amount(), dec!(14742.92));
        assert_eq!(priced.addons[0].name, "Zero Depreciation");
    }

    #[test]
    fn test_third_party_only_has_no_own_damage() {
        let company = InsuranceCompany::new("Acme General");
        let addon = zero_dep();
        let priced = card(&company, &addon)
            .price(&request(Vec::new(), PolicyType::ThirdPartyOnly))
            .unwrap();

        assert_eq!(priced.basic_premium.amount(), dec!(2094));
        assert_eq!(priced.final_premium.amount(), dec!(2470.92));
    }

    #[test]
    fn test_unsupported_addon_skipped() {
        let company = InsuranceCompany::new("Acme General");
        let addon = zero_dep();
        let other = AddonCover::new("Engine Protect", 2);
        let priced = card(&company, &addon)
            .price(&request(vec![other], PolicyType::OwnDamageOnly))
            .unwrap();

        assert!(priced.addons.is_empty());
        assert_eq!(priced.basic_premium.amount(), dec!(8320));
    }

    #[tokio::test]
    async fn test_missing_card_is_unavailable() {
        let model = RateCardModel::default();
        let company = InsuranceCompany::new("Unpriced");
        let err = model
            .price(&company, &request(Vec::new(), PolicyType::Comprehensive))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::ServiceUnavailable { .. }));
    }

    #[test]
    fn test_cards_from_json() {
        let company = InsuranceCompanyId::new();
        let json = format!(
            r#"[{{"company_id": "{}", "own_damage_rate_percent": "2.1", "third_party_premium": 2094}}]"#,
            company.as_uuid()
        );
        let model = RateCardModel::from_json(&json).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.cards[&company].gst_rate_percent, dec!(18));
    }
}

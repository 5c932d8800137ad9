//! Pre-built Test Fixtures
//!
//! Ready-to-use catalogs, customers and amounts. Identifiers are fixed so
//! assertions can name them.

use core_kernel::{AddonCoverId, Currency, CustomerId, InsuranceCompanyId, Money};
use domain_quotation::{AddonCover, AddonRate, Customer, InsuranceCompany, RateCard};
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn fixed_uuid(suffix: u128) -> Uuid {
    Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440000 + suffix)
}

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn inr(amount: Decimal) -> Money {
        Money::new(amount, Currency::INR)
    }

    /// Final premium of company A in the reference scenario
    pub fn premium_a() -> Money {
        Self::inr(dec!(18000))
    }

    /// Final premium shared by companies B and C in the reference scenario
    pub fn premium_b_c() -> Money {
        Self::inr(dec!(15500))
    }
}

/// Fixture for the insurer and addon catalogs
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub fn company_a() -> InsuranceCompany {
        Self::company(1, "A")
    }

    pub fn company_b() -> InsuranceCompany {
        Self::company(2, "B")
    }

    pub fn company_c() -> InsuranceCompany {
        Self::company(3, "C")
    }

    /// An inactive company that must never be priced
    pub fn dormant_company() -> InsuranceCompany {
        Self::company(4, "Dormant").deactivated()
    }

    /// Companies A, B and C, all active
    pub fn companies() -> Vec<InsuranceCompany> {
        vec![Self::company_a(), Self::company_b(), Self::company_c()]
    }

    pub fn zero_depreciation() -> AddonCover {
        AddonCover {
            id: AddonCoverId::from_uuid(fixed_uuid(11)),
            ..AddonCover::new("Zero Depreciation", 1)
        }
    }

    pub fn roadside_assistance() -> AddonCover {
        AddonCover {
            id: AddonCoverId::from_uuid(fixed_uuid(12)),
            ..AddonCover::new("Roadside Assistance", 2)
        }
    }

    pub fn addons() -> Vec<AddonCover> {
        vec![Self::roadside_assistance(), Self::zero_depreciation()]
    }

    /// Rate card reproducing the reference premium of 14742.92 on 520000
    pub fn reference_rate_card(company: &InsuranceCompany) -> RateCard {
        RateCard {
            company_id: company.id,
            own_damage_rate_percent: dec!(2),
            third_party_premium: dec!(2094),
            addon_rates: vec![AddonRate {
                addon_id: Self::zero_depreciation().id,
                rate_percent: dec!(0.4),
            }],
            gst_rate_percent: dec!(18),
        }
    }

    fn company(suffix: u128, name: &str) -> InsuranceCompany {
        InsuranceCompany {
            id: InsuranceCompanyId::from_uuid(fixed_uuid(suffix)),
            ..InsuranceCompany::new(name)
        }
    }
}

/// Fixture for customers
pub struct CustomerFixtures;

impl CustomerFixtures {
    /// Mobile number used as the dispatch fallback
    pub const MOBILE: &'static str = "9998887777";

    /// Customer with a mobile number
    pub fn with_mobile() -> Customer {
        Customer {
            id: CustomerId::from_uuid(fixed_uuid(21)),
            ..Customer::new("Asha Verma").with_mobile(Self::MOBILE)
        }
    }

    /// Customer without any contact number
    pub fn without_mobile() -> Customer {
        Customer {
            id: CustomerId::from_uuid(fixed_uuid(22)),
            ..Customer::new("Rahul Iyer")
        }
    }

    /// Customer with a random name and a fresh id
    pub fn random() -> Customer {
        let name: String = Name().fake();
        Customer::new(name).with_mobile(Self::MOBILE)
    }
}

//! Insured Value Calculator
//!
//! Turns declared component values of a vehicle into the insured declared
//! value (IDV) used as the basis for every premium. The calculation is pure:
//! components are summed exactly and the total is rounded once.
//!
//! # Components
//!
//! | Name | Required |
//! |---|---|
//! | `vehicle` | yes |
//! | `trailer` | no, defaults to 0 |
//! | `cng_lpg_kit` | no, defaults to 0 |
//! | `electrical_accessories` | no, defaults to 0 |
//! | `non_electrical_accessories` | no, defaults to 0 |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use core_kernel::{Currency, Money};

use crate::error::QuotationError;
use crate::input::parse_non_negative;

pub const VEHICLE: &str = "vehicle";
pub const TRAILER: &str = "trailer";
pub const CNG_LPG_KIT: &str = "cng_lpg_kit";
pub const ELECTRICAL_ACCESSORIES: &str = "electrical_accessories";
pub const NON_ELECTRICAL_ACCESSORIES: &str = "non_electrical_accessories";

const KNOWN_COMPONENTS: [&str; 5] = [
    VEHICLE,
    TRAILER,
    CNG_LPG_KIT,
    ELECTRICAL_ACCESSORIES,
    NON_ELECTRICAL_ACCESSORIES,
];

/// Declared component values, with optional parts defaulted to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsuredValueComponents {
    pub vehicle: Decimal,
    #[serde(default)]
    pub trailer: Decimal,
    #[serde(default)]
    pub cng_lpg_kit: Decimal,
    #[serde(default)]
    pub electrical_accessories: Decimal,
    #[serde(default)]
    pub non_electrical_accessories: Decimal,
}

impl InsuredValueComponents {
    /// Components for a bare vehicle without accessories
    pub fn vehicle_only(vehicle: Decimal) -> Self {
        Self {
            vehicle,
            ..Default::default()
        }
    }

    /// Parses loosely typed JSON components
    ///
    /// # Errors
    ///
    /// `InvalidInput` naming the field when `vehicle` is missing, a value is
    /// negative or non-numeric, or a component name is unknown.
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self, QuotationError> {
        if let Some(unknown) = raw.keys().find(|k| !KNOWN_COMPONENTS.contains(&k.as_str())) {
            return Err(QuotationError::invalid_input(
                unknown.as_str(),
                "unknown insured value component",
            ));
        }

        let read = |name: &str| -> Result<Option<Decimal>, QuotationError> {
            match raw.get(name) {
                Some(value) => parse_non_negative(name, value),
                None => Ok(None),
            }
        };

        let vehicle = read(VEHICLE)?
            .ok_or_else(|| QuotationError::invalid_input(VEHICLE, "is required"))?;

        Ok(Self {
            vehicle,
            trailer: read(TRAILER)?.unwrap_or_default(),
            cng_lpg_kit: read(CNG_LPG_KIT)?.unwrap_or_default(),
            electrical_accessories: read(ELECTRICAL_ACCESSORIES)?.unwrap_or_default(),
            non_electrical_accessories: read(NON_ELECTRICAL_ACCESSORIES)?.unwrap_or_default(),
        })
    }

    /// Named parts in declaration order
    pub fn parts(&self) -> [(&'static str, Decimal); 5] {
        [
            (VEHICLE, self.vehicle),
            (TRAILER, self.trailer),
            (CNG_LPG_KIT, self.cng_lpg_kit),
            (ELECTRICAL_ACCESSORIES, self.electrical_accessories),
            (NON_ELECTRICAL_ACCESSORIES, self.non_electrical_accessories),
        ]
    }

    fn validate(&self) -> Result<(), QuotationError> {
        for (name, amount) in self.parts() {
            if amount < Decimal::ZERO {
                return Err(QuotationError::invalid_input(name, "must not be negative"));
            }
        }
        Ok(())
    }
}

/// Computed insured value with the breakdown it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuredValue {
    /// Sum of all components, rounded to the currency minor unit
    pub total: Money,
    /// Defaulted component values
    pub breakdown: InsuredValueComponents,
}

/// Computes the insured value of a set of components
///
/// # Errors
///
/// `InvalidInput` when a component is negative or the sum overflows.
///
/// # Example
///
/// ```rust,ignore
/// let components = InsuredValueComponents {
///     vehicle: dec!(500000),
///     trailer: dec!(20000),
///     ..Default::default()
/// };
/// let idv = compute_insured_value(&components, Currency::INR)?;
/// assert_eq!(idv.total.amount(), dec!(520000));
/// ```
pub fn compute_insured_value(
    components: &InsuredValueComponents,
    currency: Currency,
) -> Result<InsuredValue, QuotationError> {
    components.validate()?;

    let total = components
        .parts()
        .iter()
        .try_fold(Decimal::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
        .ok_or_else(|| QuotationError::invalid_input("total", "exceeds the supported range"))?;

    Ok(InsuredValue {
        total: Money::new(total, currency).round_to_currency(),
        breakdown: *components,
    })
}

/// Parses raw JSON components and computes their insured value
pub fn compute_from_raw(
    raw: &Map<String, Value>,
    currency: Currency,
) -> Result<InsuredValue, QuotationError> {
    let components = InsuredValueComponents::from_raw(raw)?;
    compute_insured_value(&components, currency)
}

//! Read-only catalog entities
//!
//! Insurance companies, addon covers and customers are owned by the wider
//! administration system. The engine only reads them.

use serde::{Deserialize, Serialize};

use core_kernel::{AddonCoverId, CustomerId, InsuranceCompanyId};

/// An insurer that may be asked for a premium
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceCompany {
    pub id: InsuranceCompanyId,
    pub name: String,
    /// Only active companies take part in generation
    pub is_active: bool,
}

impl InsuranceCompany {
    /// Creates an active company
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: InsuranceCompanyId::new_v7(),
            name: name.into(),
            is_active: true,
        }
    }

    /// Marks the company inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// An optional cover offered on top of the base policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonCover {
    pub id: AddonCoverId,
    pub name: String,
    pub display_order: i32,
    pub is_active: bool,
}

impl AddonCover {
    pub fn new(name: impl Into<String>, display_order: i32) -> Self {
        Self {
            id: AddonCoverId::new_v7(),
            name: name.into(),
            display_order,
            is_active: true,
        }
    }
}

/// Sorts covers by display order, then name
pub fn sort_by_display_order(addons: &mut [AddonCover]) {
    addons.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// The customer a quotation is prepared for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Fallback destination for dispatch
    pub mobile_number: Option<String>,
    pub email: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new_v7(),
            name: name.into(),
            mobile_number: None,
            email: None,
        }
    }

    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile_number = Some(mobile.into());
        self
    }

    /// Stand-in for a customer that is no longer in the catalog
    pub fn unknown(id: CustomerId) -> Self {
        Self {
            id,
            name: "Customer".to_string(),
            mobile_number: None,
            email: None,
        }
    }
}

//! True daily deltas, before any presentation buffering

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::Category;
use crate::error::EvolutionError;
use crate::rates::RatePair;
use super::checked::add;

/// FX revaluation split by accounting polarity
///
/// Values keep their sign, so `total()` is the net revaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationBuckets {
    pub active_principal: Decimal,
    pub passive_principal: Decimal,
    pub active_interest: Decimal,
    pub passive_interest: Decimal,
}

impl VariationBuckets {
    /// Bucket principal and interest variation independently
    ///
    /// Asset: positive is active, negative passive. Liability: inverted.
    pub fn classify(category: Category, principal_variation: Decimal, interest_variation: Decimal) -> Self {
        let (active_principal, passive_principal) = split(category, principal_variation);
        let (active_interest, passive_interest) = split(category, interest_variation);
        Self {
            active_principal,
            passive_principal,
            active_interest,
            passive_interest,
        }
    }

    pub fn active(&self) -> Result<Decimal, EvolutionError> {
        add(self.active_principal, self.active_interest, "variation.active")
    }

    pub fn passive(&self) -> Result<Decimal, EvolutionError> {
        add(self.passive_principal, self.passive_interest, "variation.passive")
    }

    pub fn total(&self) -> Result<Decimal, EvolutionError> {
        add(self.active()?, self.passive()?, "variation.total")
    }

    /// Bucket-wise sum
    pub fn checked_add(&self, other: &Self) -> Result<Self, EvolutionError> {
        Ok(Self {
            active_principal: add(self.active_principal, other.active_principal, "variation.active_principal")?,
            passive_principal: add(self.passive_principal, other.passive_principal, "variation.passive_principal")?,
            active_interest: add(self.active_interest, other.active_interest, "variation.active_interest")?,
            passive_interest: add(self.passive_interest, other.passive_interest, "variation.passive_interest")?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.active_principal.is_zero()
            && self.passive_principal.is_zero()
            && self.active_interest.is_zero()
            && self.passive_interest.is_zero()
    }
}

/// Returns (active, passive)
fn split(category: Category, variation: Decimal) -> (Decimal, Decimal) {
    let positive_is_active = category.is_asset();
    if variation.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else if variation.is_sign_positive() == positive_is_active {
        (variation, Decimal::ZERO)
    } else {
        (Decimal::ZERO, variation)
    }
}

/// Everything that happened to the contract on one calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayStep {
    pub date: NaiveDate,
    /// 1-indexed position in the evolution range
    pub day_index: u32,

    // Rates
    pub rate: RatePair,
    pub active_rate: Decimal,
    /// Active rate of the prior day (equal to `active_rate` on day one)
    pub previous_active_rate: Decimal,

    // Opening balances
    pub opening_principal: Decimal,
    pub opening_interest: Decimal,
    pub opening_principal_converted: Decimal,
    pub opening_interest_converted: Decimal,

    // Deltas
    pub accrual: Decimal,
    pub variation: VariationBuckets,

    // Transactions
    pub transaction_count: usize,
    pub has_payment: bool,
    pub additions: Decimal,
    pub payment_principal: Decimal,
    pub payment_interest: Decimal,
    pub principal_flow: Decimal,

    // Closing balances
    pub closing_principal: Decimal,
    pub closing_interest: Decimal,
    pub closing_principal_converted: Decimal,
    pub closing_interest_converted: Decimal,
    pub capitalization_base: Decimal,
    /// Accrued interest was folded into the capitalization base today
    pub capitalized: bool,

    // Calendar flags
    pub is_first_day: bool,
    pub is_month_end: bool,
    pub is_last_day: bool,
}

impl DayStep {
    pub fn has_transactions(&self) -> bool {
        self.transaction_count > 0
    }
}

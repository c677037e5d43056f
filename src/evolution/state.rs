//! Running state of a contract during evolution

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::rates::RatePair;
use super::validate::Contract;

/// State of a contract at the close of a day
#[derive(Debug, Clone)]
pub struct EvolutionState {
    /// Current day (1-indexed, 0 before the first day)
    pub day_index: u32,

    /// Current date
    pub date: NaiveDate,

    /// Outstanding principal
    pub principal: Decimal,

    /// Accrued interest not yet settled
    pub accrued_interest: Decimal,

    /// Portion of accrued interest that itself earns interest
    /// (compound regime with monthly or annual capitalization)
    pub capitalization_base: Decimal,

    /// Last applied FX quote
    pub rate: RatePair,
}

impl EvolutionState {
    /// Initialize state before the first day
    ///
    /// Principal opens at the original value; `seed_rate` is what carries
    /// forward if nothing is quoted for the first day.
    pub fn from_contract(contract: &Contract, seed_rate: RatePair) -> Self {
        Self {
            day_index: 0,
            date: contract.start,
            principal: contract.original_value,
            accrued_interest: Decimal::ZERO,
            capitalization_base: Decimal::ZERO,
            rate: seed_rate,
        }
    }

    /// Advance to the given date
    pub fn advance_day(&mut self, date: NaiveDate) {
        self.day_index += 1;
        self.date = date;
    }

    pub fn is_first_day(&self) -> bool {
        self.day_index == 1
    }

    /// Shrink the capitalization base so it never exceeds accrued interest
    pub fn clamp_capitalization_base(&mut self) {
        if self.capitalization_base > self.accrued_interest {
            self.capitalization_base = self.accrued_interest;
        }
    }

    /// Fold all accrued interest into the capitalization base
    pub fn capitalize(&mut self) {
        self.capitalization_base = self.accrued_interest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::LoanContract;
    use rust_decimal_macros::dec;

    fn state() -> EvolutionState {
        let record = LoanContract::new("L-1", "2024-01-01", 1000.0, "USD", 12.0);
        let contract = Contract::from_record(&record).unwrap();
        EvolutionState::from_contract(&contract, RatePair::flat(Decimal::ONE))
    }

    #[test]
    fn test_initial_state() {
        let s = state();
        assert_eq!(s.day_index, 0);
        assert_eq!(s.principal, dec!(1000));
        assert_eq!(s.accrued_interest, Decimal::ZERO);
        assert!(!s.is_first_day());
    }

    #[test]
    fn test_clamp_only_shrinks() {
        let mut s = state();
        s.accrued_interest = dec!(10);
        s.capitalization_base = dec!(4);
        s.clamp_capitalization_base();
        assert_eq!(s.capitalization_base, dec!(4));

        s.accrued_interest = dec!(2.5);
        s.clamp_capitalization_base();
        assert_eq!(s.capitalization_base, dec!(2.5));
    }
}

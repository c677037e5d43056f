//! Input validation: raw contract/transaction records to typed values

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::contract::{Capitalization, Category, InterestRegime, LoanContract, Transaction, TransactionKind};
use crate::error::EvolutionError;
use super::calendar::parse_date;
use super::checked::add;

/// Convert a finite, non-negative `f64` into a `Decimal`
pub(crate) fn non_negative_decimal(field: &str, value: f64) -> Result<Decimal, EvolutionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(EvolutionError::invalid_numeric(field, value));
    }
    Decimal::from_f64(value).ok_or_else(|| EvolutionError::invalid_numeric(field, value))
}

/// Contract with parsed dates and decimal amounts
#[derive(Debug, Clone)]
pub struct Contract {
    pub id: String,
    pub start: NaiveDate,
    pub original_value: Decimal,
    pub currency: String,
    pub regime: InterestRegime,
    pub capitalization: Capitalization,
    pub category: Category,
    /// Interest rate as a fraction per day
    pub daily_rate: Decimal,
    pub first_day_rate: Option<Decimal>,
}

impl Contract {
    pub fn from_record(record: &LoanContract) -> Result<Self, EvolutionError> {
        let start = parse_date("contract.start_date", &record.start_date)?;
        let original_value = non_negative_decimal("contract.original_value", record.original_value)?;
        let rate_percent = non_negative_decimal("contract.interest_rate", record.interest_rate)?;

        if record.day_count_base == 0 {
            return Err(EvolutionError::invalid_numeric("contract.day_count_base", 0));
        }
        let divisor = Decimal::from(record.rate_period.divisor(record.day_count_base));
        let daily_rate = (rate_percent / dec!(100))
            .checked_div(divisor)
            .ok_or_else(|| EvolutionError::overflow("contract.daily_rate"))?;

        let first_day_rate = record
            .first_day_rate
            .map(|rate| non_negative_decimal("contract.first_day_rate", rate))
            .transpose()?;

        Ok(Self {
            id: record.id.clone(),
            start,
            original_value,
            currency: record.currency.clone(),
            regime: record.regime,
            capitalization: record.capitalization,
            category: record.category,
            daily_rate,
            first_day_rate,
        })
    }
}

/// All transactions falling on one day, summed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayFlows {
    pub additions: Decimal,
    pub payment_principal: Decimal,
    pub payment_interest: Decimal,
    pub count: usize,
    pub has_payment: bool,
    /// Manual rate of the last transaction on this day that carried one
    pub manual_rate: Option<Decimal>,
}

impl DayFlows {
    fn record(
        &mut self,
        kind: TransactionKind,
        principal: Decimal,
        interest: Decimal,
        manual_rate: Option<Decimal>,
    ) -> Result<(), EvolutionError> {
        match kind {
            TransactionKind::Addition => {
                self.additions = add(self.additions, principal, "transaction.principal")?;
            }
            TransactionKind::Payment => {
                self.payment_principal = add(self.payment_principal, principal, "transaction.principal")?;
                self.payment_interest = add(self.payment_interest, interest, "transaction.interest")?;
                self.has_payment = true;
            }
        }
        if manual_rate.is_some() {
            self.manual_rate = manual_rate;
        }
        self.count += 1;
        Ok(())
    }

    /// Additions minus payment principal
    pub fn principal_flow(&self) -> Decimal {
        self.additions - self.payment_principal
    }
}

/// Everything the day loop needs, validated
#[derive(Debug, Clone)]
pub struct EvolutionInput {
    pub contract: Contract,
    pub cutoff: NaiveDate,
    pub flows: BTreeMap<NaiveDate, DayFlows>,
}

impl EvolutionInput {
    /// Validate all records. Transactions outside `[start, cutoff]` are dropped
    /// after their fields have been checked.
    pub fn new(contract: &LoanContract, transactions: &[Transaction], cutoff: &str) -> Result<Self, EvolutionError> {
        let contract = Contract::from_record(contract)?;
        let cutoff = parse_date("cutoff", cutoff)?;

        let mut flows: BTreeMap<NaiveDate, DayFlows> = BTreeMap::new();
        for tx in transactions {
            let date = parse_date("transaction.date", &tx.date)?;
            let principal = non_negative_decimal("transaction.principal", tx.principal)?;
            let interest = non_negative_decimal("transaction.interest", tx.interest)?;
            let manual_rate = tx
                .manual_rate
                .map(|rate| non_negative_decimal("transaction.manual_rate", rate))
                .transpose()?;

            if date < contract.start || date > cutoff {
                continue;
            }
            flows.entry(date).or_default().record(tx.kind, principal, interest, manual_rate)?;
        }

        Ok(Self { contract, cutoff, flows })
    }

    /// Number of days in `[start, cutoff]`, or `None` when the range is empty
    pub fn day_span(&self) -> Option<i64> {
        if self.cutoff < self.contract.start {
            None
        } else {
            Some((self.cutoff - self.contract.start).num_days() + 1)
        }
    }
}

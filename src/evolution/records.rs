//! Evolution output: daily log entries, monthly records and run summary

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EvolutionError;
use super::calendar::month_label;
use super::checked::add;
use super::step::{DayStep, VariationBuckets};

/// A visible row of the daily log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: NaiveDate,

    // Rate used
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub rate: Decimal,

    pub opening_principal: Decimal,
    pub opening_interest: Decimal,

    /// Interest recognized on this row (the flushed window, zero otherwise)
    pub interest: Decimal,
    /// Additions minus payment principal, always shown on the day it happens
    pub principal_flow: Decimal,
    pub payment_interest: Decimal,
    /// FX variation recognized on this row (the flushed window, zero otherwise)
    pub variation: VariationBuckets,

    pub closing_principal: Decimal,
    pub closing_interest: Decimal,
    pub closing_principal_converted: Decimal,
    pub closing_interest_converted: Decimal,

    pub has_payment: bool,
    /// Buffered interest/variation were released on this row
    pub flushed: bool,
}

impl DailyEntry {
    /// Row for a step with the given recognized amounts
    pub fn from_step(step: &DayStep, interest: Decimal, variation: VariationBuckets, flushed: bool) -> Self {
        Self {
            date: step.date,
            buy_rate: step.rate.buy,
            sell_rate: step.rate.sell,
            rate: step.active_rate,
            opening_principal: step.opening_principal,
            opening_interest: step.opening_interest,
            interest,
            principal_flow: step.principal_flow,
            payment_interest: step.payment_interest,
            variation,
            closing_principal: step.closing_principal,
            closing_interest: step.closing_interest,
            closing_principal_converted: step.closing_principal_converted,
            closing_interest_converted: step.closing_interest_converted,
            has_payment: step.has_payment,
            flushed,
        }
    }
}

/// Summary of one calendar month with its daily rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub year: i32,
    pub month: u32,
    /// `MM/YYYY`
    pub label: String,

    /// Active rate at the last day of the month in range
    pub conversion_rate: Decimal,
    /// Active rate in force before the month's first day
    pub opening_rate: Decimal,

    pub opening_principal: Decimal,
    pub opening_interest: Decimal,
    pub opening_principal_converted: Decimal,
    pub opening_interest_converted: Decimal,

    pub closing_principal: Decimal,
    pub closing_interest: Decimal,
    pub closing_principal_converted: Decimal,
    pub closing_interest_converted: Decimal,

    /// Sum of true daily accrual
    pub interest: Decimal,
    /// Sum of true daily variation
    pub variation: VariationBuckets,
    pub principal_flow: Decimal,
    pub payment_interest: Decimal,

    /// Number of calendar days of this month inside the range
    pub days: u32,

    pub entries: Vec<DailyEntry>,
}

impl MonthlyRecord {
    /// Start a month at its first step in range
    fn open(step: &DayStep) -> Self {
        Self {
            year: step.date.year(),
            month: step.date.month(),
            label: month_label(step.date.year(), step.date.month()),
            conversion_rate: step.active_rate,
            opening_rate: step.previous_active_rate,
            opening_principal: step.opening_principal,
            opening_interest: step.opening_interest,
            opening_principal_converted: step.opening_principal_converted,
            opening_interest_converted: step.opening_interest_converted,
            closing_principal: step.closing_principal,
            closing_interest: step.closing_interest,
            closing_principal_converted: step.closing_principal_converted,
            closing_interest_converted: step.closing_interest_converted,
            interest: Decimal::ZERO,
            variation: VariationBuckets::default(),
            principal_flow: Decimal::ZERO,
            payment_interest: Decimal::ZERO,
            days: 0,
            entries: Vec::new(),
        }
    }

    fn add_step(&mut self, step: &DayStep) -> Result<(), EvolutionError> {
        self.interest = add(self.interest, step.accrual, "month.interest")?;
        self.variation = self.variation.checked_add(&step.variation)?;
        self.principal_flow = add(self.principal_flow, step.principal_flow, "month.principal_flow")?;
        self.payment_interest = add(self.payment_interest, step.payment_interest, "month.payment_interest")?;
        self.days += 1;

        self.conversion_rate = step.active_rate;
        self.closing_principal = step.closing_principal;
        self.closing_interest = step.closing_interest;
        self.closing_principal_converted = step.closing_principal_converted;
        self.closing_interest_converted = step.closing_interest_converted;
        Ok(())
    }

    pub fn key(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn last_entry(&self) -> Option<&DailyEntry> {
        self.entries.last()
    }

    /// Closing principal plus interest in domestic currency
    pub fn closing_converted(&self) -> Result<Decimal, EvolutionError> {
        add(self.closing_principal_converted, self.closing_interest_converted, "month.closing_converted")
    }
}

/// Group steps by calendar month and attach each visible row to its month
pub fn aggregate_months(steps: &[DayStep], entries: Vec<DailyEntry>) -> Result<Vec<MonthlyRecord>, EvolutionError> {
    let mut months: Vec<MonthlyRecord> = Vec::new();

    for step in steps {
        let key = (step.date.year(), step.date.month());
        match months.last_mut() {
            Some(current) if current.key() == key => current.add_step(step)?,
            _ => {
                let mut record = MonthlyRecord::open(step);
                record.add_step(step)?;
                months.push(record);
            }
        }
    }

    // Both sequences are ascending, so a single forward pass places every row
    let mut idx = 0;
    for entry in entries {
        let key = (entry.date.year(), entry.date.month());
        while idx < months.len() && months[idx].key() != key {
            idx += 1;
        }
        if let Some(month) = months.get_mut(idx) {
            month.entries.push(entry);
        }
    }

    Ok(months)
}

/// Totals over a whole evolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSummary {
    pub total_months: usize,
    pub total_days: u32,
    pub total_entries: usize,
    pub total_interest: Decimal,
    pub total_principal_flow: Decimal,
    pub total_payment_interest: Decimal,
    pub variation: VariationBuckets,
    pub final_principal: Decimal,
    pub final_interest: Decimal,
    pub final_principal_converted: Decimal,
    pub final_interest_converted: Decimal,
}

impl EvolutionSummary {
    pub fn from_months(months: &[MonthlyRecord]) -> Result<Self, EvolutionError> {
        let last = months.last();
        let mut summary = Self {
            total_months: months.len(),
            total_days: 0,
            total_entries: 0,
            total_interest: Decimal::ZERO,
            total_principal_flow: Decimal::ZERO,
            total_payment_interest: Decimal::ZERO,
            variation: VariationBuckets::default(),
            final_principal: last.map(|m| m.closing_principal).unwrap_or(Decimal::ZERO),
            final_interest: last.map(|m| m.closing_interest).unwrap_or(Decimal::ZERO),
            final_principal_converted: last.map(|m| m.closing_principal_converted).unwrap_or(Decimal::ZERO),
            final_interest_converted: last.map(|m| m.closing_interest_converted).unwrap_or(Decimal::ZERO),
        };

        for m in months {
            summary.total_days += m.days;
            summary.total_entries += m.entries.len();
            summary.total_interest = add(summary.total_interest, m.interest, "summary.total_interest")?;
            summary.total_principal_flow =
                add(summary.total_principal_flow, m.principal_flow, "summary.total_principal_flow")?;
            summary.total_payment_interest =
                add(summary.total_payment_interest, m.payment_interest, "summary.total_payment_interest")?;
            summary.variation = summary.variation.checked_add(&m.variation)?;
        }

        Ok(summary)
    }

    /// Final principal plus interest in domestic currency
    pub fn final_converted(&self) -> Result<Decimal, EvolutionError> {
        add(self.final_principal_converted, self.final_interest_converted, "summary.final_converted")
    }
}

//! Dated FX rate series indexed by date

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::Category;
use crate::error::EvolutionError;
use crate::evolution::calendar::parse_date;
use crate::evolution::validate::non_negative_decimal;

/// One quote from the exchange-rate history provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateEntry {
    /// Quote date (`dd/mm/yyyy` or `yyyy-mm-dd`)
    pub date: String,
    pub buy: f64,
    pub sell: f64,
}

impl RateEntry {
    pub fn new(date: impl Into<String>, buy: f64, sell: f64) -> Self {
        Self {
            date: date.into(),
            buy,
            sell,
        }
    }
}

/// Buy/sell quote pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePair {
    pub buy: Decimal,
    pub sell: Decimal,
}

impl RatePair {
    pub fn new(buy: Decimal, sell: Decimal) -> Self {
        Self { buy, sell }
    }

    /// Same value on both sides (manual and fixed rates)
    pub fn flat(rate: Decimal) -> Self {
        Self { buy: rate, sell: rate }
    }

    /// Side used for revaluation: buy for assets, sell for liabilities
    pub fn active(&self, category: Category) -> Decimal {
        match category {
            Category::Asset => self.buy,
            Category::Liability => self.sell,
        }
    }
}

/// Validated rate series for one currency
///
/// Lookups go by date, so input order does not matter. A later entry for the
/// same date replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateSeries {
    by_date: BTreeMap<NaiveDate, RatePair>,
}

impl RateSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and index provider entries
    pub fn from_entries(entries: &[RateEntry]) -> Result<Self, EvolutionError> {
        let mut by_date = BTreeMap::new();
        for entry in entries {
            let date = parse_date("rate.date", &entry.date)?;
            let buy = non_negative_decimal("rate.buy", entry.buy)?;
            let sell = non_negative_decimal("rate.sell", entry.sell)?;
            by_date.insert(date, RatePair::new(buy, sell));
        }
        Ok(Self { by_date })
    }

    /// Quote published for exactly this date
    pub fn get(&self, date: NaiveDate) -> Option<RatePair> {
        self.by_date.get(&date).copied()
    }

    /// Most recent quote strictly before `date`
    pub fn latest_before(&self, date: NaiveDate) -> Option<RatePair> {
        self.by_date.range(..date).next_back().map(|(_, pair)| *pair)
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// First and last quoted dates
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.by_date.keys().next()?;
        let last = self.by_date.keys().next_back()?;
        Some((*first, *last))
    }
}

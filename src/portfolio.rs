//! Batch evolution across independent loans and cross-loan balance snapshots
//!
//! Holds one rate series per currency, then evolves any number of loans in
//! parallel. Each loan is independent, so a failure in one never affects
//! the others.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::{Category, LoanBook};
use crate::error::EvolutionError;
use crate::evolution::checked::{add, sub};
use crate::evolution::{EvolutionConfig, EvolutionEngine, MonthlyRecord};
use crate::rates::RateSeries;

/// Ending balances of the last logged day at or before a reference month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub date: NaiveDate,
    pub rate: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub principal_converted: Decimal,
    pub interest_converted: Decimal,
}

impl BalanceSnapshot {
    pub fn total_converted(&self) -> Result<Decimal, EvolutionError> {
        add(self.principal_converted, self.interest_converted, "snapshot.total_converted")
    }
}

/// Snapshot at the end of reference month `year`/`month`
///
/// `None` when the loan has no logged day by then.
pub fn balance_at(months: &[MonthlyRecord], year: i32, month: u32) -> Option<BalanceSnapshot> {
    months
        .iter()
        .rev()
        .filter(|m| m.key() <= (year, month))
        .find_map(|m| m.last_entry())
        .map(|entry| BalanceSnapshot {
            date: entry.date,
            rate: entry.rate,
            principal: entry.closing_principal,
            interest: entry.closing_interest,
            principal_converted: entry.closing_principal_converted,
            interest_converted: entry.closing_interest_converted,
        })
}

/// Outcome of evolving one loan
#[derive(Debug, Clone)]
pub struct LoanEvolution {
    pub id: String,
    pub category: Category,
    pub result: Result<Vec<MonthlyRecord>, EvolutionError>,
}

/// One loan's contribution to a portfolio balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanBalance {
    pub id: String,
    pub category: Category,
    pub currency: String,
    pub snapshot: Option<BalanceSnapshot>,
}

/// Converted totals for one side of the balance sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub loans: usize,
    pub principal_converted: Decimal,
    pub interest_converted: Decimal,
}

impl CategoryTotals {
    /// Add a loan's snapshot; totals are left untouched on overflow
    fn include(&mut self, snapshot: &BalanceSnapshot) -> Result<(), EvolutionError> {
        let principal = add(self.principal_converted, snapshot.principal_converted, "totals.principal_converted")?;
        let interest = add(self.interest_converted, snapshot.interest_converted, "totals.interest_converted")?;
        self.loans += 1;
        self.principal_converted = principal;
        self.interest_converted = interest;
        Ok(())
    }

    pub fn total(&self) -> Result<Decimal, EvolutionError> {
        add(self.principal_converted, self.interest_converted, "totals.total")
    }
}

/// Cross-loan balance at a reference month
#[derive(Debug, Clone)]
pub struct PortfolioBalance {
    pub year: i32,
    pub month: u32,
    pub assets: CategoryTotals,
    pub liabilities: CategoryTotals,
    pub loans: Vec<LoanBalance>,
    /// Loans whose evolution failed, with the reason
    pub failures: Vec<(String, EvolutionError)>,
}

impl PortfolioBalance {
    /// Assets minus liabilities, in domestic currency
    pub fn net(&self) -> Result<Decimal, EvolutionError> {
        sub(self.assets.total()?, self.liabilities.total()?, "portfolio.net")
    }
}

/// Pre-loaded rate series for running many loans
#[derive(Debug, Clone)]
pub struct Portfolio {
    rates: HashMap<String, RateSeries>,
    engine: EvolutionEngine,
    empty: RateSeries,
}

impl Portfolio {
    /// Create a portfolio runner that closes the period on the cutoff day,
    /// so balance snapshots see the cutoff balances
    pub fn new(rates: HashMap<String, RateSeries>) -> Self {
        let config = EvolutionConfig {
            flush_on_cutoff: true,
            ..EvolutionConfig::default()
        };
        Self::with_config(rates, config)
    }

    pub fn with_config(rates: HashMap<String, RateSeries>, config: EvolutionConfig) -> Self {
        Self {
            rates,
            engine: EvolutionEngine::new(config),
            empty: RateSeries::new(),
        }
    }

    /// Series for a currency, or an empty one (rate falls back to 1.0)
    pub fn rates_for(&self, currency: &str) -> &RateSeries {
        self.rates.get(currency).unwrap_or(&self.empty)
    }

    /// Evolve a single loan
    pub fn evolve(&self, book: &LoanBook, cutoff: &str) -> Result<Vec<MonthlyRecord>, EvolutionError> {
        let currency = &book.contract.currency;
        if !self.rates.contains_key(currency) {
            warn!("loan {}: no rate series for {}", book.contract.id, currency);
        }
        self.engine
            .evolve(&book.contract, &book.transactions, self.rates_for(currency), cutoff)
    }

    /// Evolve all loans in parallel; results keep input order
    pub fn evolve_all(&self, books: &[LoanBook], cutoff: &str) -> Vec<LoanEvolution> {
        info!("evolving {} loans to {}", books.len(), cutoff);

        books
            .par_iter()
            .map(|book| LoanEvolution {
                id: book.contract.id.clone(),
                category: book.contract.category,
                result: self.evolve(book, cutoff),
            })
            .collect()
    }

    /// Evolve all loans and total their balances at the reference month
    pub fn balances_at(&self, books: &[LoanBook], cutoff: &str, year: i32, month: u32) -> PortfolioBalance {
        let evolutions = self.evolve_all(books, cutoff);

        let mut balance = PortfolioBalance {
            year,
            month,
            assets: CategoryTotals::default(),
            liabilities: CategoryTotals::default(),
            loans: Vec::with_capacity(books.len()),
            failures: Vec::new(),
        };

        for (book, evolution) in books.iter().zip(evolutions) {
            let months = match evolution.result {
                Ok(months) => months,
                Err(e) => {
                    warn!("loan {} failed: {}", evolution.id, e);
                    balance.failures.push((evolution.id, e));
                    continue;
                }
            };

            let snapshot = balance_at(&months, year, month);
            if let Some(snapshot) = &snapshot {
                let totals = match evolution.category {
                    Category::Asset => &mut balance.assets,
                    Category::Liability => &mut balance.liabilities,
                };
                if let Err(e) = totals.include(snapshot) {
                    warn!("loan {} overflows the {} totals", evolution.id, evolution.category.as_str());
                    balance.failures.push((evolution.id, e));
                    continue;
                }
            }
            balance.loans.push(LoanBalance {
                id: evolution.id,
                category: evolution.category,
                currency: book.contract.currency.clone(),
                snapshot,
            });
        }

        info!(
            "balance at {:02}/{}: {} assets, {} liabilities, {} failed",
            month,
            year,
            balance.assets.loans,
            balance.liabilities.loans,
            balance.failures.len()
        );
        balance
    }
}

/// Last day of the reference month, used as a default cutoff
pub fn month_end_date(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt().filter(|d| d.month() == month)
}

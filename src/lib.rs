//! Loan Evolution - Day-granular evolution engine for foreign-currency loans
//!
//! This library provides:
//! - Daily interest accrual (simple or compound, daily/monthly/annual capitalization)
//! - FX revaluation with buy/sell quotes and active/passive attribution
//! - Event-driven daily log with buffered interest and FX variation
//! - Monthly aggregation and portfolio balances across many loans

pub mod contract;
pub mod error;
pub mod evolution;
pub mod portfolio;
pub mod rates;

// Re-export commonly used types
pub use contract::{Category, LoanBook, LoanContract, Transaction, TransactionKind};
pub use error::{EvolutionError, LoadError};
pub use evolution::{evolve, DailyEntry, EvolutionConfig, EvolutionEngine, EvolutionSummary, MonthlyRecord};
pub use portfolio::{balance_at, BalanceSnapshot, Portfolio, PortfolioBalance};
pub use rates::{RateEntry, RatePair, RateSeries};

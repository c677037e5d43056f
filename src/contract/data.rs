//! Contract and transaction records as received from the surrounding application
//!
//! Dates are kept as text and amounts as `f64` here; the engine validates
//! them into typed values before a run.

use serde::{Deserialize, Serialize};

/// Default day-count base (days per year) for annual rates
fn default_day_count_base() -> u32 {
    360
}

fn default_capitalization() -> Capitalization {
    Capitalization::Monthly
}

/// Unit the contract interest rate is quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatePeriod {
    /// Percent per month (30-day month)
    Monthly,
    /// Percent per year (day-count base)
    Annual,
}

impl RatePeriod {
    /// Number of days the quoted rate is spread over
    pub fn divisor(&self, day_count_base: u32) -> u32 {
        match self {
            RatePeriod::Monthly => 30,
            RatePeriod::Annual => day_count_base,
        }
    }
}

/// Interest regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestRegime {
    /// Interest accrues on principal only
    Simple,
    /// Interest also accrues on capitalized interest
    Compound,
}

/// How often accrued interest is folded into the accrual base (compound only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capitalization {
    Daily,
    /// Last day of each month
    Monthly,
    /// December 31
    Annual,
}

/// Balance-sheet side of the contract
///
/// Selects the FX quote used for revaluation (buy for assets, sell for
/// liabilities) and the polarity of gain/loss attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Asset,
    Liability,
}

impl Category {
    pub fn is_asset(&self) -> bool {
        matches!(self, Category::Asset)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Asset => "asset",
            Category::Liability => "liability",
        }
    }
}

/// Kind of a dated transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// New principal disbursed into the contract
    Addition,
    /// Settlement split into principal and interest components
    Payment,
}

/// A loan or financing contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanContract {
    /// Contract identifier
    pub id: String,

    /// Inception date (`dd/mm/yyyy` or `yyyy-mm-dd`)
    pub start_date: String,

    /// Principal at inception, in contract currency
    pub original_value: f64,

    /// Contract currency code (e.g. "USD")
    pub currency: String,

    /// Interest rate in percent per `rate_period`
    pub interest_rate: f64,

    pub rate_period: RatePeriod,

    pub regime: InterestRegime,

    /// Only meaningful under the compound regime
    #[serde(default = "default_capitalization")]
    pub capitalization: Capitalization,

    /// Days per year used to turn an annual rate into a daily one
    #[serde(default = "default_day_count_base")]
    pub day_count_base: u32,

    pub category: Category,

    /// FX rate that replaces the market series on the first day only
    #[serde(default)]
    pub first_day_rate: Option<f64>,
}

impl LoanContract {
    /// Create a simple-interest annual-rate asset contract; adjust with the `with_*` methods
    pub fn new(
        id: impl Into<String>,
        start_date: impl Into<String>,
        original_value: f64,
        currency: impl Into<String>,
        interest_rate: f64,
    ) -> Self {
        Self {
            id: id.into(),
            start_date: start_date.into(),
            original_value,
            currency: currency.into(),
            interest_rate,
            rate_period: RatePeriod::Annual,
            regime: InterestRegime::Simple,
            capitalization: default_capitalization(),
            day_count_base: default_day_count_base(),
            category: Category::Asset,
            first_day_rate: None,
        }
    }

    pub fn with_rate_period(mut self, rate_period: RatePeriod) -> Self {
        self.rate_period = rate_period;
        self
    }

    /// Switch to compound interest with the given capitalization frequency
    pub fn compound(mut self, capitalization: Capitalization) -> Self {
        self.regime = InterestRegime::Compound;
        self.capitalization = capitalization;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_day_count_base(mut self, day_count_base: u32) -> Self {
        self.day_count_base = day_count_base;
        self
    }

    pub fn with_first_day_rate(mut self, rate: f64) -> Self {
        self.first_day_rate = Some(rate);
        self
    }
}

/// A dated addition or payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Value date (`dd/mm/yyyy` or `yyyy-mm-dd`)
    pub date: String,

    pub kind: TransactionKind,

    /// Amount added (addition) or principal component (payment)
    pub principal: f64,

    /// Interest component of a payment; ignored for additions
    #[serde(default)]
    pub interest: f64,

    /// FX rate that replaces the market series on this date only
    #[serde(default)]
    pub manual_rate: Option<f64>,
}

impl Transaction {
    pub fn addition(date: impl Into<String>, amount: f64) -> Self {
        Self {
            date: date.into(),
            kind: TransactionKind::Addition,
            principal: amount,
            interest: 0.0,
            manual_rate: None,
        }
    }

    pub fn payment(date: impl Into<String>, principal: f64, interest: f64) -> Self {
        Self {
            date: date.into(),
            kind: TransactionKind::Payment,
            principal,
            interest,
            manual_rate: None,
        }
    }

    pub fn with_manual_rate(mut self, rate: f64) -> Self {
        self.manual_rate = Some(rate);
        self
    }

    pub fn is_payment(&self) -> bool {
        matches!(self.kind, TransactionKind::Payment)
    }
}

/// A contract together with its transaction history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanBook {
    pub contract: LoanContract,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl LoanBook {
    pub fn new(contract: LoanContract, transactions: Vec<Transaction>) -> Self {
        Self { contract, transactions }
    }
}

//! Day-by-day loan evolution: accrual, capitalization and FX revaluation

pub mod calendar;
pub(crate) mod checked;
pub(crate) mod validate;
mod state;
mod step;
mod engine;
mod visibility;
mod records;

pub use calendar::{is_month_end, is_year_end, parse_date};
pub use validate::{Contract, DayFlows, EvolutionInput};
pub use state::EvolutionState;
pub use step::{DayStep, VariationBuckets};
pub use engine::{evolve, EvolutionConfig, EvolutionEngine};
pub use visibility::VisibilityPolicy;
pub use records::{aggregate_months, DailyEntry, EvolutionSummary, MonthlyRecord};

//! Presentation policy for the daily log
//!
//! Interest and FX movement are only recognized on settlement (a payment) or
//! at period close (month end). Between those points they accumulate in
//! buffers. Principal flows are always shown on the day they happen.

use rust_decimal::Decimal;

use crate::error::EvolutionError;
use super::checked::add;
use super::engine::EvolutionConfig;
use super::records::DailyEntry;
use super::step::{DayStep, VariationBuckets};

/// Which days get a row and where buffers are released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    /// Emit a row for every day, not only for event days
    pub log_every_day: bool,
    /// Treat the last day of the range as a period close
    pub flush_on_cutoff: bool,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        EvolutionConfig::default().visibility()
    }
}

impl VisibilityPolicy {
    /// Day one, any transaction, month end (and cutoff if configured)
    pub fn emits_row(&self, step: &DayStep) -> bool {
        self.log_every_day
            || step.is_first_day
            || step.has_transactions()
            || step.is_month_end
            || (self.flush_on_cutoff && step.is_last_day)
    }

    /// A payment or month end (and cutoff if configured)
    pub fn flushes(&self, step: &DayStep) -> bool {
        step.has_payment || step.is_month_end || (self.flush_on_cutoff && step.is_last_day)
    }
}

#[derive(Debug, Default)]
struct Buffer {
    interest: Decimal,
    variation: VariationBuckets,
}

impl Buffer {
    fn take(&mut self) -> (Decimal, VariationBuckets) {
        let taken = (self.interest, self.variation);
        *self = Buffer::default();
        taken
    }
}

/// Turn true daily deltas into visible log rows
pub fn apply(steps: &[DayStep], policy: VisibilityPolicy) -> Result<Vec<DailyEntry>, EvolutionError> {
    let mut buffer = Buffer::default();
    let mut entries = Vec::new();

    for step in steps {
        buffer.interest = add(buffer.interest, step.accrual, "buffered_interest")?;
        buffer.variation = buffer.variation.checked_add(&step.variation)?;

        if !policy.emits_row(step) {
            continue;
        }

        let flushed = policy.flushes(step);
        let (interest, variation) = if flushed {
            buffer.take()
        } else {
            (Decimal::ZERO, VariationBuckets::default())
        };
        entries.push(DailyEntry::from_step(step, interest, variation, flushed));
    }

    Ok(entries)
}

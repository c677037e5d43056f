//! Core evolution engine: one pass over the calendar from inception to cutoff

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::contract::{Capitalization, InterestRegime, LoanContract, Transaction};
use crate::error::EvolutionError;
use crate::rates::{RatePair, RateSeries};
use super::calendar::{is_month_end, is_year_end};
use super::checked::{add, mul, sub};
use super::records::{aggregate_months, MonthlyRecord};
use super::state::EvolutionState;
use super::step::{DayStep, VariationBuckets};
use super::validate::{Contract, DayFlows, EvolutionInput};
use super::visibility::{self, VisibilityPolicy};

/// Configuration for an evolution run
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    /// Emit a log row for every day
    pub log_every_day: bool,

    /// Also close the period on the cutoff day (row + buffer flush).
    /// Off by default: only payments and month ends flush.
    pub flush_on_cutoff: bool,

    /// Upper bound on the number of days iterated
    pub max_days: u32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            log_every_day: false,
            flush_on_cutoff: false,
            max_days: 36_600, // ~100 years
        }
    }
}

impl EvolutionConfig {
    pub fn visibility(&self) -> VisibilityPolicy {
        VisibilityPolicy {
            log_every_day: self.log_every_day,
            flush_on_cutoff: self.flush_on_cutoff,
        }
    }
}

/// Main evolution engine
#[derive(Debug, Clone, Default)]
pub struct EvolutionEngine {
    config: EvolutionConfig,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Run the evolution and aggregate it into monthly records
    pub fn evolve(
        &self,
        contract: &LoanContract,
        transactions: &[Transaction],
        rates: &RateSeries,
        cutoff: &str,
    ) -> Result<Vec<MonthlyRecord>, EvolutionError> {
        let steps = self.steps(contract, transactions, rates, cutoff)?;
        let entries = visibility::apply(&steps, self.config.visibility())?;
        aggregate_months(&steps, entries)
    }

    /// True daily deltas for every day in `[start, cutoff]`
    ///
    /// Empty when the cutoff precedes the start date.
    pub fn steps(
        &self,
        contract: &LoanContract,
        transactions: &[Transaction],
        rates: &RateSeries,
        cutoff: &str,
    ) -> Result<Vec<DayStep>, EvolutionError> {
        let input = EvolutionInput::new(contract, transactions, cutoff)?;
        let Some(days) = input.day_span() else {
            return Ok(Vec::new());
        };
        if days > i64::from(self.config.max_days) {
            return Err(EvolutionError::IterationBudgetExceeded {
                days,
                max_days: self.config.max_days,
            });
        }

        let contract = &input.contract;
        let seed_rate = rates
            .latest_before(contract.start)
            .unwrap_or(RatePair::flat(Decimal::ONE));
        let mut state = EvolutionState::from_contract(contract, seed_rate);
        let mut steps = Vec::with_capacity(days as usize);

        for date in contract.start.iter_days().take(days as usize) {
            state.advance_day(date);
            let step = self.calculate_day(&input, rates, &mut state)?;
            steps.push(step);
        }

        Ok(steps)
    }

    /// Advance the state through one day
    fn calculate_day(
        &self,
        input: &EvolutionInput,
        rates: &RateSeries,
        state: &mut EvolutionState,
    ) -> Result<DayStep, EvolutionError> {
        let contract = &input.contract;
        let date = state.date;
        let first_day = state.is_first_day();
        let no_flows = DayFlows::default();
        let flows = input.flows.get(&date).unwrap_or(&no_flows);

        let rate = self.resolve_rate(contract, rates, date, first_day, flows, state.rate);
        let active_rate = rate.active(contract.category);
        let previous_active_rate = if first_day {
            active_rate
        } else {
            state.rate.active(contract.category)
        };

        let opening_principal = state.principal;
        let opening_interest = state.accrued_interest;

        // Accrual and revaluation run on yesterday's closing balances
        let (accrual, variation) = if first_day {
            (Decimal::ZERO, VariationBuckets::default())
        } else {
            (
                self.calculate_accrual(contract, state)?,
                self.calculate_variation(contract, state, active_rate - previous_active_rate)?,
            )
        };

        self.apply_transactions(state, flows, accrual)?;

        let capitalized = self.capitalization_due(contract, date);
        if capitalized {
            state.capitalize();
        }
        state.rate = rate;

        let closing_principal_converted = mul(state.principal, active_rate, "closing_principal_converted")?;
        let closing_interest_converted = mul(state.accrued_interest, active_rate, "closing_interest_converted")?;

        Ok(DayStep {
            date,
            day_index: state.day_index,
            rate,
            active_rate,
            previous_active_rate,
            opening_principal,
            opening_interest,
            opening_principal_converted: mul(opening_principal, previous_active_rate, "opening_principal_converted")?,
            opening_interest_converted: mul(opening_interest, previous_active_rate, "opening_interest_converted")?,
            accrual,
            variation,
            transaction_count: flows.count,
            has_payment: flows.has_payment,
            additions: flows.additions,
            payment_principal: flows.payment_principal,
            payment_interest: flows.payment_interest,
            principal_flow: flows.principal_flow(),
            closing_principal: state.principal,
            closing_interest: state.accrued_interest,
            closing_principal_converted,
            closing_interest_converted,
            capitalization_base: state.capitalization_base,
            capitalized,
            is_first_day: first_day,
            is_month_end: is_month_end(date),
            is_last_day: date == input.cutoff,
        })
    }

    /// Manual rate, then fixed first-day rate, then the series, then carry-forward
    fn resolve_rate(
        &self,
        contract: &Contract,
        rates: &RateSeries,
        date: NaiveDate,
        first_day: bool,
        flows: &DayFlows,
        last_rate: RatePair,
    ) -> RatePair {
        if let Some(manual) = flows.manual_rate {
            return RatePair::flat(manual);
        }
        if first_day {
            if let Some(fixed) = contract.first_day_rate {
                return RatePair::flat(fixed);
            }
        }
        rates.get(date).unwrap_or(last_rate)
    }

    /// Interest for one day on the prior day's balances
    fn calculate_accrual(&self, contract: &Contract, state: &EvolutionState) -> Result<Decimal, EvolutionError> {
        let base = match (contract.regime, contract.capitalization) {
            (InterestRegime::Simple, _) => state.principal,
            (InterestRegime::Compound, Capitalization::Daily) => {
                add(state.principal, state.accrued_interest, "accrual_base")?
            }
            // Base is frozen between capitalization dates
            (InterestRegime::Compound, Capitalization::Monthly | Capitalization::Annual) => {
                add(state.principal, state.capitalization_base, "accrual_base")?
            }
        };
        mul(base, contract.daily_rate, "accrual")
    }

    /// Revaluation of the prior day's balances by the day's rate move
    fn calculate_variation(
        &self,
        contract: &Contract,
        state: &EvolutionState,
        rate_delta: Decimal,
    ) -> Result<VariationBuckets, EvolutionError> {
        if rate_delta.is_zero() {
            return Ok(VariationBuckets::default());
        }
        let principal_variation = mul(state.principal, rate_delta, "principal_variation")?;
        let interest_variation = mul(state.accrued_interest, rate_delta, "interest_variation")?;
        Ok(VariationBuckets::classify(contract.category, principal_variation, interest_variation))
    }

    /// Apply the day's additions and payments, then clamp the capitalization base
    fn apply_transactions(
        &self,
        state: &mut EvolutionState,
        flows: &DayFlows,
        accrual: Decimal,
    ) -> Result<(), EvolutionError> {
        let principal_flow = sub(flows.additions, flows.payment_principal, "principal_flow")?;
        state.principal = add(state.principal, principal_flow, "principal")?;

        let interest_flow = sub(accrual, flows.payment_interest, "interest_flow")?;
        state.accrued_interest = add(state.accrued_interest, interest_flow, "accrued_interest")?;

        state.clamp_capitalization_base();
        Ok(())
    }

    /// Whether accrued interest folds into the accrual base at the close of `date`
    fn capitalization_due(&self, contract: &Contract, date: NaiveDate) -> bool {
        match contract.regime {
            InterestRegime::Simple => false,
            InterestRegime::Compound => match contract.capitalization {
                Capitalization::Daily => true,
                Capitalization::Monthly => is_month_end(date),
                Capitalization::Annual => is_year_end(date),
            },
        }
    }
}

/// Run an evolution with the default configuration
pub fn evolve(
    contract: &LoanContract,
    transactions: &[Transaction],
    rates: &RateSeries,
    cutoff: &str,
) -> Result<Vec<MonthlyRecord>, EvolutionError> {
    EvolutionEngine::default().evolve(contract, transactions, rates, cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Category;
    use crate::rates::RateEntry;
    use approx::assert_abs_diff_eq;
    use chrono::Datelike;
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;

    fn test_contract() -> LoanContract {
        LoanContract::new("L-1", "2024-01-01", 1000.0, "USD", 12.0)
    }

    fn every_day() -> EvolutionEngine {
        EvolutionEngine::new(EvolutionConfig {
            log_every_day: true,
            ..Default::default()
        })
    }

    fn series(entries: &[(&str, f64)]) -> RateSeries {
        let entries: Vec<_> = entries
            .iter()
            .map(|(date, rate)| RateEntry::new(*date, *rate, *rate))
            .collect();
        RateSeries::from_entries(&entries).unwrap()
    }

    fn f(value: Decimal) -> f64 {
        value.to_f64().unwrap()
    }

    fn step_on<'a>(steps: &'a [DayStep], date: &str) -> &'a DayStep {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        steps.iter().find(|s| s.date == date).unwrap()
    }

    #[test]
    fn test_simple_interest_reference_case() {
        let engine = EvolutionEngine::default();
        let steps = engine
            .steps(&test_contract(), &[], &RateSeries::new(), "2024-01-31")
            .unwrap();

        // 31 days, day one does not accrue: 30 accrual days
        assert_eq!(steps.len(), 31);
        let last = steps.last().unwrap();
        assert_abs_diff_eq!(f(last.closing_interest), 10.0, epsilon = 1e-9);
        assert_eq!(last.closing_principal, dec!(1000));
        assert!(steps.iter().all(|s| s.variation.is_zero()));
        assert!(steps.iter().all(|s| s.active_rate == Decimal::ONE));

        let months = engine.evolve(&test_contract(), &[], &RateSeries::new(), "2024-01-31").unwrap();
        assert_eq!(months.len(), 1);
        assert_abs_diff_eq!(f(months[0].interest), 10.0, epsilon = 1e-9);
        assert!(months[0].variation.is_zero());
    }

    #[test]
    fn test_empty_range_returns_no_months() {
        let months = evolve(&test_contract(), &[], &RateSeries::new(), "2023-12-31").unwrap();
        assert!(months.is_empty());
    }

    #[test]
    fn test_single_day_range() {
        let months = evolve(&test_contract(), &[], &RateSeries::new(), "2024-01-01").unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].entries.len(), 1);
        assert_eq!(months[0].interest, Decimal::ZERO);
        assert_eq!(months[0].closing_principal, dec!(1000));
    }

    #[test]
    fn test_coverage_and_continuity_when_every_day_is_logged() {
        let txs = vec![
            Transaction::addition("2024-01-20", 500.0),
            Transaction::payment("2024-02-14", 300.0, 5.0),
            Transaction::payment("2024-03-01", 100.0, 1.0),
        ];
        let rates = series(&[("2024-01-15", 5.0), ("2024-02-01", 5.2), ("2024-03-05", 4.9)]);
        let contract = LoanContract::new("L-2", "15/01/2024", 1000.0, "USD", 10.0);

        let months = every_day().evolve(&contract, &txs, &rates, "10/03/2024").unwrap();
        let entries: Vec<_> = months.iter().flat_map(|m| m.entries.iter()).collect();

        // Jan 15..31 (17) + Feb (29) + Mar 1..10 (10)
        assert_eq!(entries.len(), 56);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        for pair in entries.windows(2) {
            assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
            assert_eq!(pair[0].closing_principal, pair[1].opening_principal);
            assert_eq!(pair[0].closing_interest, pair[1].opening_interest);
        }
    }

    #[test]
    fn test_monthly_records_chain() {
        let txs = vec![Transaction::payment("2024-02-14", 300.0, 5.0)];
        let rates = series(&[("2024-01-01", 5.0), ("2024-02-01", 5.2), ("2024-03-05", 4.9)]);
        let contract = test_contract().compound(Capitalization::Monthly);

        let engine = EvolutionEngine::default();
        let steps = engine.steps(&contract, &txs, &rates, "2024-04-15").unwrap();
        let months = engine.evolve(&contract, &txs, &rates, "2024-04-15").unwrap();

        assert_eq!(months.len(), 4);
        assert_eq!(months[0].label, "01/2024");
        assert_eq!(months[0].opening_principal, dec!(1000));
        assert_eq!(months[3].days, 15);

        for pair in months.windows(2) {
            assert_eq!(pair[0].closing_principal, pair[1].opening_principal);
            assert_eq!(pair[0].closing_interest, pair[1].opening_interest);
            assert_eq!(pair[0].conversion_rate, pair[1].opening_rate);
        }

        for month in &months {
            let accrued: f64 = steps
                .iter()
                .filter(|s| (s.date.year(), s.date.month()) == month.key())
                .map(|s| f(s.accrual))
                .sum();
            assert_abs_diff_eq!(f(month.interest), accrued, epsilon = 1e-9);
            assert_eq!(month.closing_principal_converted, month.closing_principal * month.conversion_rate);
            assert_eq!(month.opening_principal_converted, month.opening_principal * month.opening_rate);
        }

        let feb = &months[1];
        assert_eq!(feb.principal_flow, dec!(-300));
        assert_eq!(feb.payment_interest, dec!(5));
        assert_eq!(feb.conversion_rate, dec!(5.2));
    }

    #[test]
    fn test_determinism() {
        let txs = vec![
            Transaction::addition("2024-01-20", 500.0).with_manual_rate(5.05),
            Transaction::payment("2024-03-14", 300.0, 5.0),
        ];
        let rates = series(&[("2024-01-01", 5.0), ("2024-02-01", 5.2), ("2024-03-05", 4.9)]);
        let contract = test_contract().compound(Capitalization::Daily).with_category(Category::Liability);

        let first = evolve(&contract, &txs, &rates, "2024-06-30").unwrap();
        let second = evolve(&contract, &txs, &rates, "2024-06-30").unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_day_one_opens_at_original_value() {
        let txs = vec![Transaction::addition("2024-01-01", 500.0)];
        let steps = EvolutionEngine::default()
            .steps(&test_contract(), &txs, &RateSeries::new(), "2024-01-02")
            .unwrap();

        let day_one = &steps[0];
        assert!(day_one.is_first_day);
        assert_eq!(day_one.opening_principal, dec!(1000));
        assert_eq!(day_one.principal_flow, dec!(500));
        assert_eq!(day_one.closing_principal, dec!(1500));
        assert_eq!(day_one.accrual, Decimal::ZERO);

        // Day two accrues on the full 1500
        assert_eq!(steps[1].accrual, dec!(1500) * (dec!(0.12) / dec!(360)));
    }

    #[test]
    fn test_monthly_capitalization_freezes_base() {
        // Interest-only payment mid-month stays above the frozen base
        let txs = vec![Transaction::payment("2024-02-10", 0.0, 2.0)];
        let contract = test_contract().compound(Capitalization::Monthly);
        let steps = EvolutionEngine::default()
            .steps(&contract, &txs, &RateSeries::new(), "2024-03-31")
            .unwrap();

        for pair in steps.windows(2) {
            if pair[1].capitalization_base != pair[0].capitalization_base {
                assert!(pair[1].is_month_end, "base moved on {}", pair[1].date);
            }
        }

        let jan_end = step_on(&steps, "2024-01-31");
        assert!(jan_end.capitalized);
        assert_eq!(jan_end.capitalization_base, jan_end.closing_interest);
        assert_abs_diff_eq!(f(jan_end.capitalization_base), 10.0, epsilon = 1e-9);

        let payment_day = step_on(&steps, "2024-02-10");
        assert!(!payment_day.capitalized);
        assert_eq!(payment_day.capitalization_base, jan_end.capitalization_base);

        let next = step_on(&steps, "2024-02-11");
        let daily_rate = dec!(0.12) / dec!(360);
        assert_eq!(next.accrual, (dec!(1000) + jan_end.capitalization_base) * daily_rate);
    }

    #[test]
    fn test_annual_capitalization_matches_simple_within_year() {
        let simple = EvolutionEngine::default()
            .steps(&test_contract(), &[], &RateSeries::new(), "2024-12-31")
            .unwrap();
        let annual = EvolutionEngine::default()
            .steps(&test_contract().compound(Capitalization::Annual), &[], &RateSeries::new(), "2025-01-10")
            .unwrap();

        let dec_31 = step_on(&annual, "2024-12-31");
        assert_eq!(dec_31.closing_interest, simple.last().unwrap().closing_interest);
        assert!(dec_31.capitalized);
        assert_eq!(annual.iter().filter(|s| s.capitalized).count(), 1);

        // From January the base includes last year's interest
        let jan_2 = step_on(&annual, "2025-01-02");
        assert!(jan_2.accrual > simple[1].accrual);
    }

    #[test]
    fn test_daily_compounding_outgrows_simple() {
        let simple = EvolutionEngine::default()
            .steps(&test_contract(), &[], &RateSeries::new(), "2024-06-30")
            .unwrap();
        let daily = EvolutionEngine::default()
            .steps(&test_contract().compound(Capitalization::Daily), &[], &RateSeries::new(), "2024-06-30")
            .unwrap();

        assert!(daily.last().unwrap().closing_interest > simple.last().unwrap().closing_interest);
        assert!(daily.iter().all(|s| s.capitalization_base == s.closing_interest));
    }

    #[test]
    fn test_payment_clamps_capitalization_base() {
        // Base is ~10.0 after January; paying 12 of ~13.33 accrued drops below it
        let txs = vec![Transaction::payment("2024-02-10", 0.0, 12.0)];
        let contract = test_contract().compound(Capitalization::Monthly);
        let steps = EvolutionEngine::default()
            .steps(&contract, &txs, &RateSeries::new(), "2024-02-20")
            .unwrap();

        let before = step_on(&steps, "2024-02-09");
        let payment_day = step_on(&steps, "2024-02-10");
        assert!(payment_day.capitalization_base < before.capitalization_base);
        assert_eq!(payment_day.capitalization_base, payment_day.closing_interest);
        assert!(steps.iter().all(|s| s.capitalization_base <= s.closing_interest));
    }

    #[test]
    fn test_fx_variation_math() {
        let rates = series(&[("2024-01-01", 5.0), ("2024-01-02", 5.2), ("2024-01-03", 5.1)]);
        let steps = EvolutionEngine::default()
            .steps(&test_contract(), &[], &rates, "2024-01-04")
            .unwrap();

        // Day one: no variation even though rate differs from the seed
        assert!(steps[0].variation.is_zero());

        // +0.2 on 1000 principal, no interest yet
        assert_eq!(steps[1].variation.active_principal, dec!(200));
        assert_eq!(steps[1].variation.active_interest, Decimal::ZERO);

        // -0.1 on principal and on day two's closing interest
        assert_eq!(steps[2].variation.passive_principal, dec!(-100));
        assert_eq!(steps[2].variation.passive_interest, steps[1].closing_interest * dec!(-0.1));
        assert_eq!(steps[2].variation.active().unwrap(), Decimal::ZERO);

        // Day four carries 5.1 forward
        assert_eq!(steps[3].active_rate, dec!(5.1));
        assert!(steps[3].variation.is_zero());
    }

    #[test]
    fn test_asset_liability_inversion() {
        let rates = series(&[
            ("2024-01-01", 5.0),
            ("2024-01-02", 5.2),
            ("2024-01-03", 5.1),
            ("2024-01-05", 5.3),
            ("2024-01-09", 4.8),
        ]);
        let txs = vec![Transaction::payment("2024-01-06", 100.0, 1.0)];
        let asset = EvolutionEngine::default()
            .steps(&test_contract(), &txs, &rates, "2024-01-10")
            .unwrap();
        let liability = EvolutionEngine::default()
            .steps(&test_contract().with_category(Category::Liability), &txs, &rates, "2024-01-10")
            .unwrap();

        assert!(asset.iter().any(|s| !s.variation.is_zero()));
        for (a, l) in asset.iter().zip(&liability) {
            assert_eq!(a.variation.active_principal, l.variation.passive_principal);
            assert_eq!(a.variation.passive_principal, l.variation.active_principal);
            assert_eq!(a.variation.active_interest, l.variation.passive_interest);
            assert_eq!(a.variation.passive_interest, l.variation.active_interest);
            assert_eq!(a.variation.total().unwrap(), l.variation.total().unwrap());
            assert_eq!(a.accrual, l.accrual);
        }
    }

    #[test]
    fn test_category_selects_rate_side() {
        let rates = RateSeries::from_entries(&[RateEntry::new("2024-01-01", 5.0, 5.5)]).unwrap();
        let asset = EvolutionEngine::default()
            .steps(&test_contract(), &[], &rates, "2024-01-01")
            .unwrap();
        let liability = EvolutionEngine::default()
            .steps(&test_contract().with_category(Category::Liability), &[], &rates, "2024-01-01")
            .unwrap();

        assert_eq!(asset[0].active_rate, dec!(5.0));
        assert_eq!(liability[0].active_rate, dec!(5.5));
        assert_eq!(liability[0].closing_principal_converted, dec!(5500));
    }

    #[test]
    fn test_manual_rate_overrides_one_day_then_carries_forward() {
        let rates = series(&[("2024-01-01", 5.0), ("2024-01-02", 5.0), ("2024-01-04", 5.5)]);
        let txs = vec![Transaction::addition("2024-01-02", 10.0).with_manual_rate(6.0)];
        let steps = EvolutionEngine::default()
            .steps(&test_contract(), &txs, &rates, "2024-01-04")
            .unwrap();

        assert_eq!(steps[1].rate, RatePair::flat(dec!(6)));
        assert_eq!(steps[2].active_rate, dec!(6));
        assert_eq!(steps[3].active_rate, dec!(5.5));
    }

    #[test]
    fn test_first_day_rate_and_seed() {
        let rates = series(&[("2023-12-29", 4.5), ("2024-01-01", 5.0), ("2024-01-02", 5.1)]);

        let fixed = EvolutionEngine::default()
            .steps(&test_contract().with_first_day_rate(4.0), &[], &rates, "2024-01-02")
            .unwrap();
        assert_eq!(fixed[0].active_rate, dec!(4));
        assert_eq!(fixed[1].active_rate, dec!(5.1));

        // Nothing quoted on day one: carry forward the last quote before start
        let gapped = series(&[("2023-12-29", 4.5), ("2024-01-03", 5.0)]);
        let seeded = EvolutionEngine::default()
            .steps(&test_contract(), &[], &gapped, "2024-01-03")
            .unwrap();
        assert_eq!(seeded[0].active_rate, dec!(4.5));
        assert_eq!(seeded[1].active_rate, dec!(4.5));
        assert_eq!(seeded[2].active_rate, dec!(5));
    }

    #[test]
    fn test_iteration_budget() {
        let engine = EvolutionEngine::new(EvolutionConfig {
            max_days: 10,
            ..Default::default()
        });
        let err = engine
            .evolve(&test_contract(), &[], &RateSeries::new(), "2024-01-31")
            .unwrap_err();
        assert_eq!(err, EvolutionError::IterationBudgetExceeded { days: 31, max_days: 10 });
    }

    #[test]
    fn test_invalid_inputs_abort() {
        let bad_cutoff = evolve(&test_contract(), &[], &RateSeries::new(), "31-01-2024");
        assert!(matches!(bad_cutoff, Err(EvolutionError::InvalidDate { .. })));

        let nan_rate = vec![Transaction::addition("2024-01-05", 10.0).with_manual_rate(f64::NAN)];
        let err = evolve(&test_contract(), &nan_rate, &RateSeries::new(), "2024-01-31");
        assert!(matches!(err, Err(EvolutionError::InvalidNumeric { .. })));

        let negative = vec![Transaction::payment("2024-01-05", -10.0, 0.0)];
        let err = evolve(&test_contract(), &negative, &RateSeries::new(), "2024-01-31");
        assert!(matches!(err, Err(EvolutionError::InvalidNumeric { .. })));
    }

    #[test]
    fn test_overpayment_is_not_an_error() {
        let txs = vec![Transaction::payment("2024-01-10", 1500.0, 50.0)];
        let steps = EvolutionEngine::default()
            .steps(&test_contract(), &txs, &RateSeries::new(), "2024-01-15")
            .unwrap();
        let payment_day = step_on(&steps, "2024-01-10");
        assert_eq!(payment_day.closing_principal, dec!(-500));
        assert!(payment_day.closing_interest < Decimal::ZERO);
    }

    #[test]
    fn test_same_day_overflow_is_an_error() {
        let txs = vec![
            Transaction::addition("2024-01-05", 5e28),
            Transaction::addition("2024-01-05", 5e28),
        ];
        let err = evolve(&test_contract(), &txs, &RateSeries::new(), "2024-01-31").unwrap_err();
        assert_eq!(err, EvolutionError::overflow("transaction.principal"));
    }

    #[test]
    fn test_buffered_variation_overflow_is_an_error() {
        // Each swing fits, but two passive moves of -5e28 overflow the buffer
        let contract = LoanContract::new("L-1", "2024-01-01", 5e28, "USD", 0.0);
        let rates = series(&[("2024-01-01", 1.0), ("2024-01-02", 0.0), ("2024-01-03", 1.0), ("2024-01-04", 0.0)]);

        let steps = EvolutionEngine::default()
            .steps(&contract, &[], &rates, "2024-01-04")
            .unwrap();
        assert!(steps[1].variation.passive_principal < Decimal::ZERO);
        assert_eq!(steps[3].variation.passive_principal, steps[1].variation.passive_principal);

        let err = evolve(&contract, &[], &rates, "2024-01-04").unwrap_err();
        assert!(matches!(err, EvolutionError::InvalidNumeric { .. }));
    }

    #[test]
    fn test_empty_series_uses_first_day_rate_throughout() {
        let contract = test_contract().with_first_day_rate(4.0);
        let txs = vec![Transaction::payment("2024-01-15", 100.0, 2.0)];
        let steps = EvolutionEngine::default()
            .steps(&contract, &txs, &RateSeries::new(), "2024-02-10")
            .unwrap();

        assert_eq!(steps.len(), 41);
        assert!(steps.iter().all(|s| s.active_rate == dec!(4)));
        assert!(steps.iter().all(|s| s.variation.is_zero()));
        assert_eq!(steps[0].closing_principal_converted, dec!(4000));
    }

    #[test]
    fn test_default_evolve_has_no_cutoff_row() {
        let months = evolve(&test_contract(), &[], &RateSeries::new(), "2024-02-15").unwrap();
        let dates: Vec<_> = months.iter().flat_map(|m| m.entries.iter().map(|e| e.date)).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            ]
        );
        // February accrual is still counted in the month, just not shown on a row yet
        assert_abs_diff_eq!(f(months[1].interest), 15.0 * 1000.0 * 0.12 / 360.0, epsilon = 1e-9);
        assert!(months[1].entries.is_empty());

        let closing = EvolutionEngine::new(EvolutionConfig {
            flush_on_cutoff: true,
            ..Default::default()
        });
        let months = closing.evolve(&test_contract(), &[], &RateSeries::new(), "2024-02-15").unwrap();
        let cutoff_row = months[1].last_entry().unwrap();
        assert!(cutoff_row.flushed);
        assert_eq!(cutoff_row.interest, months[1].interest);
    }
}

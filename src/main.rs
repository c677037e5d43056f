//! Loan Evolution CLI
//!
//! Evolves one contract to a cutoff date, prints the monthly table and
//! writes the daily log to CSV

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use loan_evolution::contract::{load_contract, load_transactions};
use loan_evolution::rates::load_rate_series;
use loan_evolution::{EvolutionConfig, EvolutionEngine, EvolutionSummary, MonthlyRecord, RateSeries};

#[derive(Parser, Debug)]
#[command(name = "loan_evolution", version, about = "Evolve a loan contract day by day")]
struct Cli {
    /// Contract JSON file
    #[arg(long)]
    contract: PathBuf,

    /// Transaction CSV file (date,kind,principal,interest,manual_rate)
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// Rate CSV file (date,buy,sell); without it every day converts at 1.0
    #[arg(long)]
    rates: Option<PathBuf>,

    /// Last day to evolve (dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long)]
    cutoff: String,

    /// Emit a daily row for every day
    #[arg(long)]
    every_day: bool,

    /// Close the period on the cutoff day: emit a row and release buffered interest and FX
    #[arg(long)]
    flush_on_cutoff: bool,

    /// Daily log output path
    #[arg(short, long, default_value = "evolution_output.csv")]
    output: PathBuf,

    /// Refuse ranges longer than this many days
    #[arg(long, default_value_t = 36_600)]
    max_days: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let contract = load_contract(&cli.contract)
        .with_context(|| format!("loading contract {}", cli.contract.display()))?;
    let transactions = match &cli.transactions {
        Some(path) => load_transactions(path).with_context(|| format!("loading transactions {}", path.display()))?,
        None => Vec::new(),
    };
    let rates = match &cli.rates {
        Some(path) => load_rate_series(path).with_context(|| format!("loading rates {}", path.display()))?,
        None => RateSeries::new(),
    };

    println!("Loan Evolution v{}", env!("CARGO_PKG_VERSION"));
    println!("======================\n");
    println!("Contract: {}", contract.id);
    println!("  Start: {}", contract.start_date);
    println!("  Original Value: {:.2} {}", contract.original_value, contract.currency);
    println!("  Rate: {}% {:?} ({:?})", contract.interest_rate, contract.rate_period, contract.regime);
    println!("  Category: {}", contract.category.as_str());
    println!("  Transactions: {}", transactions.len());
    println!();

    let config = EvolutionConfig {
        log_every_day: cli.every_day,
        flush_on_cutoff: cli.flush_on_cutoff,
        max_days: cli.max_days,
    };
    let engine = EvolutionEngine::new(config);
    let months = engine
        .evolve(&contract, &transactions, &rates, &cli.cutoff)
        .with_context(|| format!("evolving contract {}", contract.id))?;
    info!("contract {}: {} months evolved", contract.id, months.len());

    print_months(&months)?;
    write_daily_log(&cli.output, &months)?;
    println!("\nDaily log written to: {}", cli.output.display());

    let summary = EvolutionSummary::from_months(&months)?;
    println!("\nSummary:");
    println!("  Total Days: {}", summary.total_days);
    println!("  Total Months: {}", summary.total_months);
    println!("  Logged Rows: {}", summary.total_entries);
    println!("  Total Interest: {:.2}", summary.total_interest);
    println!("  Total Interest Paid: {:.2}", summary.total_payment_interest);
    println!("  Net Principal Flow: {:.2}", summary.total_principal_flow);
    println!("  FX Active: {:.2}", summary.variation.active()?);
    println!("  FX Passive: {:.2}", summary.variation.passive()?);
    println!("  Final Principal: {:.2}", summary.final_principal);
    println!("  Final Interest: {:.2}", summary.final_interest);
    println!("  Final Converted: {:.2}", summary.final_converted()?);

    Ok(())
}

fn print_months(months: &[MonthlyRecord]) -> Result<()> {
    println!("Monthly Evolution ({} months):", months.len());
    println!(
        "{:>7} {:>10} {:>14} {:>12} {:>12} {:>12} {:>14} {:>16}",
        "Month", "Rate", "Principal", "Interest", "Flow", "FX", "Accrued", "Converted"
    );
    println!("{}", "-".repeat(104));

    for m in months {
        println!(
            "{:>7} {:>10.4} {:>14.2} {:>12.2} {:>12.2} {:>12.2} {:>14.2} {:>16.2}",
            m.label,
            m.conversion_rate,
            m.closing_principal,
            m.interest,
            m.principal_flow,
            m.variation.total()?,
            m.closing_interest,
            m.closing_converted()?,
        );
    }
    Ok(())
}

fn write_daily_log(path: &Path, months: &[MonthlyRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "Date",
        "BuyRate",
        "SellRate",
        "Rate",
        "OpeningPrincipal",
        "OpeningInterest",
        "Interest",
        "PrincipalFlow",
        "PaymentInterest",
        "ActivePrincipalFX",
        "PassivePrincipalFX",
        "ActiveInterestFX",
        "PassiveInterestFX",
        "ClosingPrincipal",
        "ClosingInterest",
        "ClosingPrincipalConverted",
        "ClosingInterestConverted",
        "Payment",
        "Flushed",
    ])?;

    for entry in months.iter().flat_map(|m| &m.entries) {
        writer.write_record([
            entry.date.format("%d/%m/%Y").to_string(),
            entry.buy_rate.to_string(),
            entry.sell_rate.to_string(),
            entry.rate.to_string(),
            format!("{:.8}", entry.opening_principal),
            format!("{:.8}", entry.opening_interest),
            format!("{:.8}", entry.interest),
            format!("{:.8}", entry.principal_flow),
            format!("{:.8}", entry.payment_interest),
            format!("{:.8}", entry.variation.active_principal),
            format!("{:.8}", entry.variation.passive_principal),
            format!("{:.8}", entry.variation.active_interest),
            format!("{:.8}", entry.variation.passive_interest),
            format!("{:.8}", entry.closing_principal),
            format!("{:.8}", entry.closing_interest),
            format!("{:.8}", entry.closing_principal_converted),
            format!("{:.8}", entry.closing_interest_converted),
            entry.has_payment.to_string(),
            entry.flushed.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

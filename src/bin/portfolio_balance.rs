//! Evolve every loan in a manifest and report the balance at a reference month
//!
//! Rates are read from `<rates-dir>/<CURRENCY>.csv`

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use loan_evolution::contract::load_manifest;
use loan_evolution::portfolio::month_end_date;
use loan_evolution::rates::load_rates_dir;
use loan_evolution::Portfolio;

#[derive(Parser, Debug)]
#[command(name = "portfolio_balance", version, about = "Converted balance of a loan portfolio")]
struct Cli {
    /// Manifest JSON: [{"contract": {...}, "transactions": "path.csv"}]
    #[arg(long)]
    manifest: PathBuf,

    /// Directory with one rate CSV per currency
    #[arg(long, default_value = "rates")]
    rates_dir: PathBuf,

    /// Last day to evolve; defaults to the end of the reference month
    #[arg(long)]
    cutoff: Option<String>,

    /// Reference year
    #[arg(long)]
    year: i32,

    /// Reference month (1-12)
    #[arg(long)]
    month: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cutoff = match cli.cutoff {
        Some(cutoff) => cutoff,
        None => match month_end_date(cli.year, cli.month) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => bail!("invalid reference month {:02}/{}", cli.month, cli.year),
        },
    };

    let start = Instant::now();
    println!("Loading loans from {}...", cli.manifest.display());
    let books = load_manifest(&cli.manifest).with_context(|| format!("loading manifest {}", cli.manifest.display()))?;

    let currencies: BTreeSet<&str> = books.iter().map(|b| b.contract.currency.as_str()).collect();
    let currencies: Vec<&str> = currencies.into_iter().collect();
    let rates = load_rates_dir(&cli.rates_dir, &currencies)
        .with_context(|| format!("loading rates from {}", cli.rates_dir.display()))?;
    println!(
        "Loaded {} loans and {} of {} rate series in {:?}",
        books.len(),
        rates.len(),
        currencies.len(),
        start.elapsed()
    );

    println!("Running evolutions to {}...", cutoff);
    let run_start = Instant::now();
    let portfolio = Portfolio::new(rates);
    let balance = portfolio.balances_at(&books, &cutoff, cli.year, cli.month);
    println!("Evolutions complete in {:?}", run_start.elapsed());

    println!("\nLoan balances at {:02}/{}:", cli.month, cli.year);
    println!(
        "{:<16} {:<10} {:>5} {:>12} {:>16} {:>14} {:>16}",
        "Loan", "Category", "Ccy", "Date", "Principal", "Interest", "Converted"
    );
    println!("{}", "-".repeat(95));
    for loan in &balance.loans {
        match &loan.snapshot {
            Some(s) => println!(
                "{:<16} {:<10} {:>5} {:>12} {:>16.2} {:>14.2} {:>16.2}",
                loan.id,
                loan.category.as_str(),
                loan.currency,
                s.date.format("%d/%m/%Y"),
                s.principal,
                s.interest,
                s.total_converted()?,
            ),
            None => println!(
                "{:<16} {:<10} {:>5} {:>12}",
                loan.id,
                loan.category.as_str(),
                loan.currency,
                "not started"
            ),
        }
    }

    println!("\nTotals (domestic currency):");
    println!(
        "  Assets:      {:>16.2}  ({} loans)",
        balance.assets.total()?,
        balance.assets.loans
    );
    println!(
        "  Liabilities: {:>16.2}  ({} loans)",
        balance.liabilities.total()?,
        balance.liabilities.loans
    );
    println!("  Net:         {:>16.2}", balance.net()?);

    if !balance.failures.is_empty() {
        println!("\nFailed loans:");
        for (id, err) in &balance.failures {
            println!("  {}: {}", id, err);
        }
    }

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}

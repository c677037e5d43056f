//! CSV-based rate series loader
//!
//! Files hold one quote per row with header `date,buy,sell`. Dates follow
//! the provider's `dd/mm/yyyy` format (ISO dates are accepted too).

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use log::{debug, warn};

use super::{RateEntry, RateSeries};
use crate::error::LoadError;

/// Load raw rate entries from a CSV file
pub fn load_rate_entries<P: AsRef<Path>>(path: P) -> Result<Vec<RateEntry>, LoadError> {
    let file = File::open(path.as_ref())?;
    let entries = load_rate_entries_from_reader(file)?;
    debug!("loaded {} rate entries from {}", entries.len(), path.as_ref().display());
    Ok(entries)
}

/// Load raw rate entries from any reader
pub fn load_rate_entries_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<RateEntry>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for result in csv_reader.deserialize() {
        let entry: RateEntry = result?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Load and validate a rate series from a CSV file
pub fn load_rate_series<P: AsRef<Path>>(path: P) -> Result<RateSeries, LoadError> {
    let entries = load_rate_entries(path)?;
    Ok(RateSeries::from_entries(&entries)?)
}

/// Load `<dir>/<CURRENCY>.csv` for each requested currency
///
/// Currencies without a file are skipped; evolutions in those currencies
/// run on the fallback rate.
pub fn load_rates_dir<P: AsRef<Path>>(dir: P, currencies: &[&str]) -> Result<HashMap<String, RateSeries>, LoadError> {
    let dir = dir.as_ref();
    let mut rates = HashMap::new();

    for currency in currencies {
        if rates.contains_key(*currency) {
            continue;
        }
        let path = dir.join(format!("{}.csv", currency));
        if !path.exists() {
            warn!("no rate series for {} at {}", currency, path.display());
            continue;
        }
        rates.insert(currency.to_string(), load_rate_series(&path)?);
    }

    Ok(rates)
}

//! FX rate series and their loaders

mod series;
pub mod loader;

pub use series::{RateEntry, RatePair, RateSeries};
pub use loader::{load_rate_entries, load_rate_entries_from_reader, load_rate_series, load_rates_dir};

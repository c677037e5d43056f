//! Calendar helpers: date parsing and period boundaries

use chrono::{Datelike, NaiveDate};

use crate::error::EvolutionError;

/// Formats accepted for textual dates: the rate provider's `dd/mm/yyyy` and ISO
const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

/// Parse a textual date, reporting `field` on failure
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, EvolutionError> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| EvolutionError::invalid_date(field, value))
}

/// Last calendar day of the date's month
pub fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// December 31
pub fn is_year_end(date: NaiveDate) -> bool {
    date.month() == 12 && date.day() == 31
}

/// `MM/YYYY` label used for monthly records
pub fn month_label(year: i32, month: u32) -> String {
    format!("{:02}/{}", month, year)
}

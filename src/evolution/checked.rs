//! Overflow-checked decimal arithmetic; overflow reports the field being computed

use rust_decimal::Decimal;

use crate::error::EvolutionError;

pub(crate) fn mul(a: Decimal, b: Decimal, field: &str) -> Result<Decimal, EvolutionError> {
    a.checked_mul(b).ok_or_else(|| EvolutionError::overflow(field))
}

pub(crate) fn add(a: Decimal, b: Decimal, field: &str) -> Result<Decimal, EvolutionError> {
    a.checked_add(b).ok_or_else(|| EvolutionError::overflow(field))
}

pub(crate) fn sub(a: Decimal, b: Decimal, field: &str) -> Result<Decimal, EvolutionError> {
    a.checked_sub(b).ok_or_else(|| EvolutionError::overflow(field))
}

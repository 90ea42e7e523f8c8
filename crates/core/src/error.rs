#![forbid(unsafe_code)]

use thiserror::Error;

/// Input that breaks a classifier contract. Surfaced to the caller instead of
/// being clamped, because it points at corrupted upstream data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("{field} must be non-negative (got {value})")]
    NegativeCount { field: &'static str, value: i64 },
    #[error("invalid tier table: {0}")]
    InvalidTierTable(&'static str),
    #[error("invalid edge thresholds (low={low}, high={high}); expected 1 <= low < high")]
    InvalidEdgeThresholds { low: i64, high: i64 },
}

pub(crate) fn ensure_non_negative(
    field: &'static str,
    value: i64,
) -> Result<(), ContractViolation> {
    if value < 0 {
        return Err(ContractViolation::NegativeCount { field, value });
    }
    Ok(())
}

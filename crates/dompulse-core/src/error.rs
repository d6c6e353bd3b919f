use thiserror::Error;

/// Validation and contract errors exposed by `dompulse-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("snapshot must carry at least one asset figure")]
    EmptySnapshot,
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("dominance for '{asset}' must lie in 0..=100, got {value}")]
    DominanceOutOfRange { asset: String, value: f64 },
    #[error("total capitalization must be positive, got {value}")]
    NonPositiveTotal { value: f64 },
}

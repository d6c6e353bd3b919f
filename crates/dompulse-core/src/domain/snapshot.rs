use std::collections::BTreeMap;

use crate::ValidationError;

/// Which representation of market structure a snapshot carries.
///
/// Upstream payload variants differ: some report per-asset dominance
/// percentages directly, some report capitalization figures from which
/// dominance must be derived, and some report both. Each shape has its own
/// extraction and validation path instead of speculative per-field probing.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotShape {
    /// Per-asset dominance percentages, keyed by lowercase asset symbol.
    Dominance(BTreeMap<String, f64>),
    /// Per-asset capitalizations in raw currency units; the aggregate total
    /// lives on the snapshot and is required for this shape.
    Capitalization(BTreeMap<String, f64>),
    /// Both representations from the same fetch.
    Combined {
        dominance: BTreeMap<String, f64>,
        caps: BTreeMap<String, f64>,
    },
}

/// One point-in-time market snapshot as returned by a provider fetch.
///
/// Immutable; consumed by exactly one derivation pass and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub shape: SnapshotShape,
    /// Aggregate market capitalization in raw currency units, when reported.
    pub total_cap: Option<f64>,
    /// Signed 24h capitalization change percentage, when reported.
    pub change_24h: Option<f64>,
}

impl MarketSnapshot {
    /// Snapshot built from dominance percentages.
    pub fn dominance(
        dominance: BTreeMap<String, f64>,
        total_cap: Option<f64>,
        change_24h: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_dominance(&dominance)?;
        validate_optional_total(total_cap)?;
        validate_optional_finite("change_24h", change_24h)?;
        Ok(Self {
            shape: SnapshotShape::Dominance(dominance),
            total_cap,
            change_24h,
        })
    }

    /// Snapshot built from capitalization figures. The aggregate total is
    /// mandatory for this shape.
    pub fn capitalization(
        caps: BTreeMap<String, f64>,
        total_cap: f64,
        change_24h: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_caps(&caps)?;
        validate_total(total_cap)?;
        validate_optional_finite("change_24h", change_24h)?;
        Ok(Self {
            shape: SnapshotShape::Capitalization(caps),
            total_cap: Some(total_cap),
            change_24h,
        })
    }

    /// Snapshot carrying both representations from one fetch.
    pub fn combined(
        dominance: BTreeMap<String, f64>,
        caps: BTreeMap<String, f64>,
        total_cap: f64,
        change_24h: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_dominance(&dominance)?;
        validate_caps(&caps)?;
        validate_total(total_cap)?;
        validate_optional_finite("change_24h", change_24h)?;
        Ok(Self {
            shape: SnapshotShape::Combined { dominance, caps },
            total_cap: Some(total_cap),
            change_24h,
        })
    }
}

fn validate_dominance(dominance: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    if dominance.is_empty() {
        return Err(ValidationError::EmptySnapshot);
    }
    for (asset, value) in dominance {
        if !value.is_finite() || !(0.0..=100.0).contains(value) {
            return Err(ValidationError::DominanceOutOfRange {
                asset: asset.clone(),
                value: *value,
            });
        }
    }
    Ok(())
}

fn validate_caps(caps: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    if caps.is_empty() {
        return Err(ValidationError::EmptySnapshot);
    }
    for value in caps.values() {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "caps" });
        }
        if *value < 0.0 {
            return Err(ValidationError::NegativeValue { field: "caps" });
        }
    }
    Ok(())
}

fn validate_total(total: f64) -> Result<(), ValidationError> {
    if !total.is_finite() || total <= 0.0 {
        return Err(ValidationError::NonPositiveTotal { value: total });
    }
    Ok(())
}

fn validate_optional_total(total: Option<f64>) -> Result<(), ValidationError> {
    match total {
        Some(value) => validate_total(value),
        None => Ok(()),
    }
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    match value {
        Some(value) if !value.is_finite() => Err(ValidationError::NonFiniteValue { field }),
        _ => Ok(()),
    }
}

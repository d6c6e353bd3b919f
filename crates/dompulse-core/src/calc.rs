//! Pure derivation of market indicators from a snapshot.
//!
//! No I/O and no clock access: the same snapshot always produces the same
//! [`DerivedMetrics`], field for field. Missing fields are schema drift, not
//! transient conditions, so [`CalculationError`] is never retried.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{DerivedMetrics, MarketSnapshot, SnapshotShape};
use crate::ValidationError;

/// Divisor applied to raw capitalization once, at derivation time, purely for
/// presentation. Full precision is preserved up to this single scaling point.
pub const CAP_TRILLIONS_SCALE: f64 = 1e12;

/// Asset whose dominance drives alerting.
pub const PRIMARY_ASSET: &str = "btc";
/// The other major asset subtracted out of the altcoin index.
pub const SECONDARY_ASSET: &str = "eth";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculationError {
    #[error("snapshot is missing required field '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Derive indicator values from one snapshot.
///
/// Dominance percentages are preferred when the snapshot carries them;
/// capitalization-only snapshots derive dominance from the cap figures. Both
/// paths agree within floating-point tolerance for snapshots that supply both
/// representations.
pub fn derive(snapshot: &MarketSnapshot) -> Result<DerivedMetrics, CalculationError> {
    let (btc_dominance, altcoin_index) = match &snapshot.shape {
        SnapshotShape::Dominance(dominance)
        | SnapshotShape::Combined { dominance, .. } => {
            let btc = share(dominance, PRIMARY_ASSET)?;
            let eth = share(dominance, SECONDARY_ASSET)?;
            (btc, altcoin_index_from_dominance(btc, eth))
        }
        SnapshotShape::Capitalization(caps) => {
            let total = snapshot
                .total_cap
                .ok_or(CalculationError::MissingField("total_cap"))?;
            let btc_cap = cap(caps, PRIMARY_ASSET)?;
            let eth_cap = cap(caps, SECONDARY_ASSET)?;
            (
                btc_cap / total * 100.0,
                altcoin_index_from_caps(total, btc_cap, eth_cap),
            )
        }
    };

    let total_cap_trillions = snapshot.total_cap.map(|total| total / CAP_TRILLIONS_SCALE);

    Ok(DerivedMetrics::new(
        btc_dominance,
        altcoin_index,
        total_cap_trillions,
        snapshot.change_24h,
    )?)
}

/// Altcoin index from the dominance-pair representation.
pub fn altcoin_index_from_dominance(btc_pct: f64, eth_pct: f64) -> f64 {
    100.0 - btc_pct - eth_pct
}

/// Altcoin index from the capitalization representation.
pub fn altcoin_index_from_caps(total_cap: f64, btc_cap: f64, eth_cap: f64) -> f64 {
    (total_cap - btc_cap - eth_cap) / total_cap * 100.0
}

fn share(
    dominance: &BTreeMap<String, f64>,
    asset: &'static str,
) -> Result<f64, CalculationError> {
    dominance
        .get(asset)
        .copied()
        .ok_or(CalculationError::MissingField(asset))
}

fn cap(caps: &BTreeMap<String, f64>, asset: &'static str) -> Result<f64, CalculationError> {
    caps.get(asset)
        .copied()
        .ok_or(CalculationError::MissingField(asset))
}

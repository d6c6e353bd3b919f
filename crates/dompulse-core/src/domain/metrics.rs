use crate::ValidationError;

/// Indicators derived from one [`MarketSnapshot`](super::MarketSnapshot).
///
/// `btc_dominance` and `altcoin_index` always derive from the same fetch, so
/// they are jointly consistent. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    /// BTC share of total market capitalization, in percent.
    pub btc_dominance: f64,
    /// Share of capitalization held outside the dominant assets, in percent.
    pub altcoin_index: f64,
    /// Aggregate capitalization scaled to trillions for presentation; `None`
    /// when the snapshot carried no capitalization figures.
    pub total_cap_trillions: Option<f64>,
    /// Signed 24h change percentage, when reported upstream.
    pub change_24h: Option<f64>,
}

impl DerivedMetrics {
    pub fn new(
        btc_dominance: f64,
        altcoin_index: f64,
        total_cap_trillions: Option<f64>,
        change_24h: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_finite("btc_dominance", btc_dominance)?;
        validate_finite("altcoin_index", altcoin_index)?;
        if let Some(total) = total_cap_trillions {
            validate_finite("total_cap_trillions", total)?;
            if total < 0.0 {
                return Err(ValidationError::NegativeValue {
                    field: "total_cap_trillions",
                });
            }
        }
        if let Some(change) = change_24h {
            validate_finite("change_24h", change)?;
        }

        Ok(Self {
            btc_dominance,
            altcoin_index,
            total_cap_trillions,
            change_24h,
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue { field })
    }
}

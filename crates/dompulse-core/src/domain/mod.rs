mod metrics;
mod snapshot;

pub use metrics::DerivedMetrics;
pub use snapshot::{MarketSnapshot, SnapshotShape};

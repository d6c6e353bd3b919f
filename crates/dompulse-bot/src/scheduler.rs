//! Fixed-interval scheduling loop.
//!
//! The loop sleeps a fixed duration between cycles rather than anchoring to
//! wall-clock ticks, so a slow cycle drifts the schedule. That drift is the
//! chosen policy: each notification is self-contained and an hour-scale
//! cadence does not need tick alignment.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{error, info};

use dompulse_core::{CycleOutcome, DispatchPolicy};

/// Scheduling state, owned exclusively by the scheduler task and mutated
/// only after a cycle completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleState {
    pub interval: Duration,
    pub last_run: Option<OffsetDateTime>,
}

impl ScheduleState {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    fn record_run(&mut self) {
        self.last_run = Some(OffsetDateTime::now_utc());
    }
}

/// Drive cycles forever. The first cycle runs immediately; every cycle
/// outcome, success or failure, is absorbed here and never ends the loop.
pub async fn run(policy: Arc<DispatchPolicy>, mut state: ScheduleState) {
    loop {
        let report = policy.run_cycle().await;
        state.record_run();

        match &report.outcome {
            CycleOutcome::Sent => {
                info!(
                    cycle_id = %report.cycle_id,
                    attempts = report.attempts.len(),
                    "scheduled cycle delivered"
                );
            }
            CycleOutcome::Exhausted { last_error } => {
                error!(
                    cycle_id = %report.cycle_id,
                    attempts = report.attempts.len(),
                    %last_error,
                    "scheduled cycle failed"
                );
            }
        }

        tokio::time::sleep(state.interval).await;
    }
}

//! Dispatch policy: one fetch → derive → notify cycle with a shared retry
//! budget, linear backoff, and bounded rate-limit waits.
//!
//! The policy holds no mutable state, so the scheduled loop and manual
//! triggers may run cycles concurrently without coordination; overlapping
//! cycles may both send, which is accepted behavior.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::calc::{self, CalculationError};
use crate::domain::DerivedMetrics;
use crate::notify::{NotificationTarget, Notifier, NotifierError};
use crate::provider::{MarketDataProvider, ProviderError};
use crate::retry::RetryConfig;

/// Dominance thresholds controlling the alert annotation.
///
/// Critical is checked first; at most one annotation is emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Dominance at or below this adds the warning annotation.
    pub warning: f64,
    /// Dominance strictly below this adds the critical annotation instead.
    pub critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warning: 55.0,
            critical: 50.0,
        }
    }
}

/// Per-cycle dispatch configuration. Passed in explicitly; the policy reads
/// no ambient state.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub target: NotificationTarget,
    pub thresholds: AlertThresholds,
    pub retry: RetryConfig,
}

/// Why an attempt did not conclude the cycle, or that it did.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Sent,
    /// Retryable failure; `backoff` is the sleep scheduled after it, absent
    /// when the budget was already exhausted.
    TransientFailure {
        error: String,
        backoff: Option<Duration>,
    },
    /// Upstream asked for a wait; `wait` includes jitter. Absent wait means
    /// the rate-limit cap was already spent.
    RateLimited {
        wait: Option<Duration>,
    },
    /// Non-retryable; the cycle aborted here.
    Aborted {
        error: String,
    },
}

/// Ephemeral record of one attempt within a cycle. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationAttempt {
    pub cycle_id: Uuid,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

/// Terminal result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Sent,
    Exhausted { last_error: String },
}

/// Everything a caller learns about one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub outcome: CycleOutcome,
    pub attempts: Vec<NotificationAttempt>,
}

impl CycleReport {
    pub fn sent(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Sent)
    }
}

/// Composes metrics into a message and drives delivery with retries.
#[derive(Clone)]
pub struct DispatchPolicy {
    provider: Arc<dyn MarketDataProvider>,
    notifier: Arc<dyn Notifier>,
    config: DispatchConfig,
}

impl DispatchPolicy {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            provider,
            notifier,
            config,
        }
    }

    /// Run one fetch → derive → notify cycle.
    ///
    /// Provider errors and transient notifier errors draw from one attempt
    /// budget with linear backoff between attempts. Rate-limit signals wait
    /// the upstream duration plus jitter and retry only the send, up to a
    /// fixed cap. Calculation errors abort immediately. The cycle never
    /// panics and always terminates within the sum of its bounded waits.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let retry = &self.config.retry;
        let mut attempts = Vec::new();
        let mut attempt = 1_u32;

        loop {
            let snapshot = match self.provider.fetch().await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    match self.note_transient(&mut attempts, cycle_id, attempt, &error) {
                        Some(delay) => {
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        None => return self.exhausted(cycle_id, attempts, error.to_string()),
                    }
                }
            };

            let metrics = match calc::derive(&snapshot) {
                Ok(metrics) => metrics,
                Err(error) => return self.aborted(cycle_id, attempts, attempt, error),
            };

            let notification = self
                .config
                .target
                .message(format_message(&metrics, &self.config.thresholds));

            let mut rate_limit_waits = 0_u32;
            loop {
                match self.notifier.send(&notification).await {
                    Ok(()) => {
                        attempts.push(NotificationAttempt {
                            cycle_id,
                            attempt,
                            outcome: AttemptOutcome::Sent,
                        });
                        info!(%cycle_id, attempt, "notification sent");
                        return CycleReport {
                            cycle_id,
                            outcome: CycleOutcome::Sent,
                            attempts,
                        };
                    }
                    Err(NotifierError::RateLimited { retry_after }) => {
                        rate_limit_waits += 1;
                        if rate_limit_waits > retry.max_rate_limit_waits {
                            attempts.push(NotificationAttempt {
                                cycle_id,
                                attempt,
                                outcome: AttemptOutcome::RateLimited { wait: None },
                            });
                            return self.exhausted(
                                cycle_id,
                                attempts,
                                format!(
                                    "rate limited {rate_limit_waits} times, cap is {}",
                                    retry.max_rate_limit_waits
                                ),
                            );
                        }

                        let wait = retry.rate_limit_wait(retry_after);
                        attempts.push(NotificationAttempt {
                            cycle_id,
                            attempt,
                            outcome: AttemptOutcome::RateLimited { wait: Some(wait) },
                        });
                        warn!(%cycle_id, wait_ms = wait.as_millis() as u64, "rate limited, waiting");
                        // Retry the send only; the snapshot stays valid.
                        tokio::time::sleep(wait).await;
                    }
                    Err(error @ NotifierError::Transient(_)) => {
                        match self.note_transient(&mut attempts, cycle_id, attempt, &error) {
                            Some(delay) => {
                                tokio::time::sleep(delay).await;
                                attempt += 1;
                                break; // transient send failure restarts from fetch
                            }
                            None => {
                                return self.exhausted(cycle_id, attempts, error.to_string())
                            }
                        }
                    }
                }
            }
        }
    }

    /// Record a transient failure; returns the backoff to sleep, or `None`
    /// when the attempt budget is spent.
    fn note_transient(
        &self,
        attempts: &mut Vec<NotificationAttempt>,
        cycle_id: Uuid,
        attempt: u32,
        error: &dyn std::fmt::Display,
    ) -> Option<Duration> {
        let retry = &self.config.retry;
        let backoff = (attempt < retry.max_attempts)
            .then(|| retry.delay_for_attempt(attempt));

        attempts.push(NotificationAttempt {
            cycle_id,
            attempt,
            outcome: AttemptOutcome::TransientFailure {
                error: error.to_string(),
                backoff,
            },
        });

        if let Some(delay) = backoff {
            warn!(%cycle_id, attempt, delay_ms = delay.as_millis() as u64, %error, "transient failure, backing off");
        }
        backoff
    }

    fn exhausted(
        &self,
        cycle_id: Uuid,
        attempts: Vec<NotificationAttempt>,
        last_error: String,
    ) -> CycleReport {
        warn!(%cycle_id, %last_error, "cycle exhausted retry budget");
        CycleReport {
            cycle_id,
            outcome: CycleOutcome::Exhausted { last_error },
            attempts,
        }
    }

    fn aborted(
        &self,
        cycle_id: Uuid,
        mut attempts: Vec<NotificationAttempt>,
        attempt: u32,
        error: CalculationError,
    ) -> CycleReport {
        attempts.push(NotificationAttempt {
            cycle_id,
            attempt,
            outcome: AttemptOutcome::Aborted {
                error: error.to_string(),
            },
        });
        warn!(%cycle_id, %error, "calculation failed, aborting cycle");
        CycleReport {
            cycle_id,
            outcome: CycleOutcome::Exhausted {
                last_error: error.to_string(),
            },
            attempts,
        }
    }
}

/// Render the notification text: indicator lines plus at most one alert
/// annotation, critical taking precedence over warning.
pub fn format_message(metrics: &DerivedMetrics, thresholds: &AlertThresholds) -> String {
    let mut lines = vec![
        format!("📊 *BTC Dominance* {:.2}%", metrics.btc_dominance),
        format!("🪙 *Altcoin Index* {:.2}%", metrics.altcoin_index),
    ];

    if let Some(total) = metrics.total_cap_trillions {
        lines.push(format!("💰 *Total Market Cap* ${total:.2}T"));
    }
    if let Some(change) = metrics.change_24h {
        lines.push(format!("📈 *24h Change* {change:+.2}%"));
    }

    if metrics.btc_dominance < thresholds.critical {
        lines.push(format!(
            "🚨 *CRITICAL* BTC dominance below {:.0}%",
            thresholds.critical
        ));
    } else if metrics.btc_dominance <= thresholds.warning {
        lines.push(format!(
            "⚠️ *ALERT* BTC dominance at or below {:.0}%",
            thresholds.warning
        ));
    }

    lines.join("\n")
}

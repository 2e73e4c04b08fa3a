use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::TimingConfig;
use crate::constants::{COARSE_TICK_SECS, COUNTDOWN_WINDOW_SECS, PRECISION_HANDOFF_SECS};
use crate::engine::clock::Clock;
use crate::utils::{format_duration, format_instant};

enum StageOutcome {
    Fired,
    Cancelled,
}

/// Two-stage trigger: a coarse 10-second monitor for long waits hands off to
/// a single-shot precision timer inside the last minute, which in turn ends
/// in a bounded spin-wait for the final offset. A single long timer would
/// carry more relative drift; the coarse stage keeps the long wait cheap.
///
/// The execution callback is invoked exactly once. Cancelling the token
/// stops whichever stage is armed; an already-entered spin-wait finishes
/// but execution is suppressed afterwards.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    timing: TimingConfig,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, timing: TimingConfig, cancel: CancellationToken) -> Self {
        Self {
            clock,
            timing,
            cancel,
        }
    }

    pub async fn run<F, Fut>(self, execute: F)
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        let unlock_ms = self.timing.unlock_timestamp.saturating_mul(1_000);
        let trigger_ms = unlock_ms.saturating_sub(self.timing.trigger_offset_ms);

        let now = self.clock.now_ms();
        if now >= unlock_ms {
            info!("⚡ Unlock time has passed, executing immediately...");
            execute().await;
            return;
        }

        let remaining_secs = (unlock_ms - now) / 1_000;
        info!(
            "⏰ Scheduling execution for {}",
            format_instant(self.timing.unlock_timestamp)
        );
        info!("   Time remaining: {}", format_duration(remaining_secs));
        info!(
            "   Will trigger {}ms before unlock time",
            self.timing.trigger_offset_ms
        );

        if remaining_secs > PRECISION_HANDOFF_SECS {
            info!("📅 Using coarse monitor for countdown...");
            if matches!(self.coarse_monitor(unlock_ms).await, StageOutcome::Cancelled) {
                return;
            }
        }

        if matches!(self.precision_stage(trigger_ms).await, StageOutcome::Cancelled) {
            return;
        }

        let fired_at = self.clock.now_ms();
        let drift = fired_at as i64 - trigger_ms as i64;
        info!("🎯 Precision trigger fired (drift: {}ms)", drift);

        if self.timing.trigger_offset_ms > 0 {
            self.clock
                .spin_until(unlock_ms, self.timing.spin_wait_max_ms);
        }

        // A shutdown issued during the spin must not re-trigger execution
        if self.cancel.is_cancelled() {
            return;
        }

        execute().await;
    }

    /// Fixed-cadence monitor for long waits. Logs remaining time at
    /// whole-minute boundaries and hands off to the precision stage exactly
    /// once, when remaining time first crosses the handoff threshold.
    async fn coarse_monitor(&self, unlock_ms: u64) -> StageOutcome {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return StageOutcome::Cancelled,
                _ = self.clock.sleep(Duration::from_secs(COARSE_TICK_SECS)) => {
                    let now = self.clock.now_ms();
                    let remaining = unlock_ms.saturating_sub(now) / 1_000;
                    if remaining <= PRECISION_HANDOFF_SECS {
                        info!("⏰ Switching to precision timer...");
                        return StageOutcome::Fired;
                    }
                    if remaining % 60 == 0 {
                        info!("   ⏳ {} remaining...", format_duration(remaining));
                    }
                }
            }
        }
    }

    /// Single-shot timer to the trigger instant. The per-second countdown
    /// inside the last ten seconds is log output only.
    async fn precision_stage(&self, trigger_ms: u64) -> StageOutcome {
        let delay = trigger_ms.saturating_sub(self.clock.now_ms());
        info!("🎯 Precision timer set: {}ms until trigger", delay);

        let countdown_ms = COUNTDOWN_WINDOW_SECS * 1_000;
        loop {
            let now = self.clock.now_ms();
            if now >= trigger_ms {
                return StageOutcome::Fired;
            }
            let remaining = trigger_ms - now;
            // Sleep straight to the countdown window, then in 1s steps
            let step = if remaining > countdown_ms {
                remaining - countdown_ms
            } else {
                remaining.min(1_000)
            };

            tokio::select! {
                _ = self.cancel.cancelled() => return StageOutcome::Cancelled,
                _ = self.clock.sleep(Duration::from_millis(step)) => {
                    let left = trigger_ms.saturating_sub(self.clock.now_ms());
                    if left > 0 && left <= countdown_ms {
                        info!("   ⏱️ {:.3}s until execution...", left as f64 / 1_000.0);
                    }
                }
            }
        }
    }
}

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

/// Time source for the scheduler. Injectable so the two-stage timing logic
/// and the spin-wait can be driven by virtual time in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Wall-clock time as unix milliseconds
    fn now_ms(&self) -> u64;

    async fn sleep(&self, duration: Duration);

    /// Busy-wait until `target_ms`, returning the instant actually reached.
    /// The wait is skipped entirely when the remaining gap is zero or
    /// exceeds `max_wait_ms`; a badly delayed trigger must not burn CPU
    /// for an unbounded stretch.
    fn spin_until(&self, target_ms: u64, max_wait_ms: u64) -> u64;
}

/// Real wall-clock implementation. `spin_until` is a deliberate blocking,
/// non-yielding loop; timing precision here is the point of the bot.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        crate::utils::current_timestamp_ms()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spin_until(&self, target_ms: u64, max_wait_ms: u64) -> u64 {
        let now = self.now_ms();
        let gap = target_ms.saturating_sub(now);
        if gap == 0 || gap > max_wait_ms {
            return now;
        }

        info!("   🔥 Spin-waiting final {}ms for precision...", gap);
        while self.now_ms() < target_ms {
            std::hint::spin_loop();
        }
        let reached = self.now_ms();
        info!(
            "   🎯 Target reached at {}",
            crate::utils::format_instant(reached / 1000)
        );
        reached
    }
}

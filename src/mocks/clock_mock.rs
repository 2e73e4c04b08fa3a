use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::engine::clock::Clock;

/// Virtual clock for scheduler tests. `sleep` parks the caller until the
/// test advances time past its wake-up instant; `spin_until` records the
/// request and jumps straight to the target (or skips, like the real one).
pub struct MockClock {
    now_ms: AtomicU64,
    advanced: Notify,
    sleep_calls: Mutex<Vec<u64>>,
    spin_calls: Mutex<Vec<(u64, u64)>>,
}

impl MockClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
            advanced: Notify::new(),
            sleep_calls: Mutex::new(Vec::new()),
            spin_calls: Mutex::new(Vec::new()),
        }
    }

    /// Move virtual time forward and wake every parked sleeper
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
        self.advanced.notify_waiters();
    }

    /// Requested sleep durations (ms), in call order
    pub fn sleep_calls(&self) -> Vec<u64> {
        self.sleep_calls.lock().unwrap().clone()
    }

    /// (target_ms, max_wait_ms) pairs passed to spin_until, in call order
    pub fn spin_calls(&self) -> Vec<(u64, u64)> {
        self.spin_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        let requested = duration.as_millis() as u64;
        self.sleep_calls.lock().unwrap().push(requested);
        let wake_at = self.now_ms() + requested;
        loop {
            // Register before re-checking so an advance between the check
            // and the await cannot be missed
            let notified = self.advanced.notified();
            if self.now_ms() >= wake_at {
                return;
            }
            notified.await;
        }
    }

    fn spin_until(&self, target_ms: u64, max_wait_ms: u64) -> u64 {
        self.spin_calls.lock().unwrap().push((target_ms, max_wait_ms));
        let now = self.now_ms();
        let gap = target_ms.saturating_sub(now);
        if gap == 0 || gap > max_wait_ms {
            return now;
        }
        self.now_ms.store(target_ms, Ordering::SeqCst);
        target_ms
    }
}

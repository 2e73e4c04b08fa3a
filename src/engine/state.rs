use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::types::{BotPhase, ClaimableBalanceSummary, EngineStatus, SubmissionResult};
use crate::utils::format_instant;

/// Single source of truth for bot phase and the outcome of the last
/// execution attempt. One instance per engine; mutated only by the
/// scheduler/racer path, read by status reporting.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub phase: BotPhase,
    pub target_instant: u64,
    pub is_running: bool,
    pub source_public_key: Option<String>,
    pub fee_payer_public_key: Option<String>,
    pub claimable_balance: Option<ClaimableBalanceSummary>,
    pub last_error: Option<String>,
    pub last_result: Option<SubmissionResult>,
}

impl EngineState {
    pub fn new(target_instant: u64) -> Self {
        Self {
            phase: BotPhase::Idle,
            target_instant,
            is_running: false,
            source_public_key: None,
            fee_payer_public_key: None,
            claimable_balance: None,
            last_error: None,
            last_result: None,
        }
    }

    /// Legal phase transitions. Skipping a phase is not allowed: even an
    /// already-passed target goes through `Preparing` before `Executing`.
    fn is_legal(from: BotPhase, to: BotPhase) -> bool {
        use BotPhase::*;
        matches!(
            (from, to),
            (Idle, Preparing)
                | (Preparing, Waiting)
                | (Preparing, Executing)
                | (Preparing, Error)
                | (Waiting, Executing)
                | (Executing, Completed)
                | (Executing, Error)
        )
    }
}

/// Shared handle over the engine state. Readers always see a self-consistent
/// snapshot; writes are brief and never held across awaits.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<EngineState>>,
}

impl SharedState {
    pub fn new(target_instant: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(EngineState::new(target_instant))),
        }
    }

    /// Apply a phase transition, refusing illegal ones. Returns whether the
    /// transition was applied.
    pub fn transition(&self, to: BotPhase) -> bool {
        let mut state = self.inner.write().unwrap();
        let from = state.phase;
        if !EngineState::is_legal(from, to) {
            warn!("⚠️ Illegal phase transition {} -> {} refused", from, to);
            return false;
        }
        debug!("🔀 Phase {} -> {}", from, to);
        state.phase = to;
        true
    }

    pub fn phase(&self) -> BotPhase {
        self.inner.read().unwrap().phase
    }

    pub fn is_running(&self) -> bool {
        self.inner.read().unwrap().is_running
    }

    pub fn set_running(&self, running: bool) {
        self.inner.write().unwrap().is_running = running;
    }

    pub fn set_identity(&self, source: String, fee_payer: String) {
        let mut state = self.inner.write().unwrap();
        state.source_public_key = Some(source);
        state.fee_payer_public_key = Some(fee_payer);
    }

    pub fn set_claimable(&self, summary: Option<ClaimableBalanceSummary>) {
        self.inner.write().unwrap().claimable_balance = summary;
    }

    pub fn set_error(&self, message: String) {
        self.inner.write().unwrap().last_error = Some(message);
    }

    pub fn set_result(&self, result: SubmissionResult) {
        self.inner.write().unwrap().last_result = Some(result);
    }

    /// Shutdown reset: back to idle regardless of current phase. The last
    /// result and error survive for post-mortem inspection.
    pub fn reset(&self) {
        let mut state = self.inner.write().unwrap();
        state.phase = BotPhase::Idle;
        state.is_running = false;
    }

    pub fn snapshot(&self) -> EngineState {
        self.inner.read().unwrap().clone()
    }

    /// Synchronous status read for operators. `now` (unix seconds) comes
    /// from the caller's clock so remaining time matches the scheduler's
    /// time source.
    pub fn status(&self, now: u64) -> EngineStatus {
        let state = self.inner.read().unwrap();
        EngineStatus {
            is_running: state.is_running,
            phase: state.phase,
            target_instant: state.target_instant,
            target_instant_iso: format_instant(state.target_instant),
            remaining_seconds: state.target_instant.saturating_sub(now),
            source_public_key: state.source_public_key.clone(),
            fee_payer_public_key: state.fee_payer_public_key.clone(),
            claimable_balance: state.claimable_balance.clone(),
            last_error: state.last_error.clone(),
            last_result: state.last_result.clone(),
            current_time: now,
            current_time_iso: format_instant(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_happy_path() {
        let state = SharedState::new(2_000_000_000);
        assert_eq!(state.phase(), BotPhase::Idle);
        assert!(state.transition(BotPhase::Preparing));
        assert!(state.transition(BotPhase::Waiting));
        assert!(state.transition(BotPhase::Executing));
        assert!(state.transition(BotPhase::Completed));
    }

    #[test]
    fn test_preparing_straight_to_executing() {
        // Target already passed: waiting is skipped, preparing is not
        let state = SharedState::new(1_000);
        assert!(state.transition(BotPhase::Preparing));
        assert!(state.transition(BotPhase::Executing));
        assert!(state.transition(BotPhase::Error));
    }

    #[test]
    fn test_idle_to_executing_refused() {
        let state = SharedState::new(1_000);
        assert!(!state.transition(BotPhase::Executing));
        assert_eq!(state.phase(), BotPhase::Idle);
    }

    #[test]
    fn test_terminal_phases_refuse_transitions() {
        let state = SharedState::new(1_000);
        state.transition(BotPhase::Preparing);
        state.transition(BotPhase::Executing);
        state.transition(BotPhase::Completed);
        assert!(!state.transition(BotPhase::Executing));
        assert!(!state.transition(BotPhase::Preparing));
        assert_eq!(state.phase(), BotPhase::Completed);
    }

    #[test]
    fn test_reset_returns_to_idle_keeping_result() {
        let state = SharedState::new(1_000);
        state.transition(BotPhase::Preparing);
        state.transition(BotPhase::Executing);
        state.set_error("all endpoints failed".to_string());
        state.transition(BotPhase::Error);
        state.reset();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, BotPhase::Idle);
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.last_error.as_deref(), Some("all endpoints failed"));
    }

    #[test]
    fn test_status_snapshot_is_consistent() {
        let now = 1_700_000_000;
        let target = now + 3_600;
        let state = SharedState::new(target);
        state.set_identity("GSOURCE".to_string(), "GFEEPAYER".to_string());
        state.transition(BotPhase::Preparing);

        let status = state.status(now);
        assert_eq!(status.phase, BotPhase::Preparing);
        assert_eq!(status.target_instant, target);
        assert_eq!(status.remaining_seconds, 3_600);
        assert_eq!(status.source_public_key.as_deref(), Some("GSOURCE"));
        assert_eq!(status.current_time, now);

        // A passed target never reports negative remaining time
        let status = state.status(target + 100);
        assert_eq!(status.remaining_seconds, 0);
    }
}

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bundle::{BundleProvider, HorizonBundleProvider};
use crate::config::Config;
use crate::engine::clock::Clock;
use crate::engine::racer::SubmissionRacer;
use crate::engine::scheduler::Scheduler;
use crate::engine::state::SharedState;
use crate::fees::FeeEstimator;
use crate::horizon::HorizonClient;
use crate::keys::Keypair;
use crate::types::{Account, BotPhase, ClaimableBalance, EngineStatus, SweepError};
use crate::utils::{format_duration, format_instant, stroops_to_units};

/// Orchestrates one sweep cycle: account verification, two-stage scheduling,
/// fee estimation, envelope assembly and the failover race. One engine drives
/// one unlock instant; restarting after a finished cycle goes through
/// `shutdown` first.
pub struct SweepEngine {
    config: Arc<Config>,
    horizon: Arc<dyn HorizonClient>,
    clock: Arc<dyn Clock>,
    fees: FeeEstimator,
    state: SharedState,
    source: Keypair,
    fee_payer: Keypair,
    preferred_endpoint: Mutex<String>,
    bundle_provider: Mutex<Option<Arc<dyn BundleProvider>>>,
    cancel: Mutex<CancellationToken>,
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
}

impl SweepEngine {
    pub fn new(
        config: Arc<Config>,
        horizon: Arc<dyn HorizonClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SweepError> {
        let source = Keypair::from_secret(&config.accounts.source_secret)?;
        let fee_payer = Keypair::from_secret(&config.accounts.fee_payer_secret)?;
        let first_endpoint = config
            .network
            .horizon_urls
            .first()
            .cloned()
            .ok_or_else(|| {
                SweepError::Configuration("at least one Horizon URL is required".to_string())
            })?;

        Ok(Self {
            fees: FeeEstimator::new(config.clone()),
            state: SharedState::new(config.timing.unlock_timestamp),
            source,
            fee_payer,
            preferred_endpoint: Mutex::new(first_endpoint),
            bundle_provider: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            scheduler_task: Mutex::new(None),
            config,
            horizon,
            clock,
        })
    }

    /// Replace the live envelope assembler; used by tests
    #[cfg(test)]
    pub fn with_bundle_provider(self, provider: Arc<dyn BundleProvider>) -> Self {
        *self.bundle_provider.lock().unwrap() = Some(provider);
        self
    }

    pub fn source_public_key(&self) -> &str {
        self.source.public_key()
    }

    pub fn preferred_endpoint(&self) -> String {
        self.preferred_endpoint.lock().unwrap().clone()
    }

    /// Verify accounts against the Horizon priority list and arm the engine.
    /// Walks the endpoints in order; the first one that can load the source
    /// account becomes the preferred endpoint for all later queries.
    async fn initialize(&self) -> Result<(), SweepError> {
        if !self.state.transition(BotPhase::Preparing) {
            return Err(SweepError::Configuration(
                "engine is not idle; shut it down before starting again".to_string(),
            ));
        }

        info!("🚀 Initializing sweep engine...");
        info!("   Source account: {}", self.source.public_key());
        info!("   Fee payer account: {}", self.fee_payer.public_key());

        let mut selected: Option<(String, Account)> = None;
        for url in &self.config.network.horizon_urls {
            match self.horizon.load_account(url, self.source.public_key()).await {
                Ok(account) => {
                    info!("✅ Connected to {}", url);
                    selected = Some((url.clone(), account));
                    break;
                }
                Err(e) => {
                    warn!("⚠️ {} unavailable: {}", url, e);
                }
            }
        }

        let (endpoint, source_account) = selected.ok_or_else(|| SweepError::Connectivity {
            endpoint: self
                .config
                .network
                .horizon_urls
                .last()
                .cloned()
                .unwrap_or_default(),
            detail: "no Horizon endpoint could load the source account".to_string(),
        })?;

        if let Some(balance) = source_account.native_balance() {
            info!("   Source balance: {} Pi", balance);
        }

        let fee_payer_account = self
            .horizon
            .load_account(&endpoint, self.fee_payer.public_key())
            .await?;
        if let Some(balance) = fee_payer_account.native_balance() {
            info!("   Fee payer balance: {} Pi", balance);
        }

        // The claimable lookup is informational; a failure here must not
        // block the sweep itself
        match &self.config.accounts.balance_id {
            Some(balance_id) => {
                match self.horizon.claimable_balance(&endpoint, balance_id).await {
                    Ok(cb) => {
                        info!("   Claimable balance: {} ({})", cb.amount, cb.id);
                        self.state.set_claimable(Some(cb.summary()));
                    }
                    Err(e) => warn!("⚠️ Could not verify claimable balance {}: {}", balance_id, e),
                }
            }
            None => {
                match self
                    .horizon
                    .list_claimables(&endpoint, self.source.public_key())
                    .await
                {
                    Ok(claimables) => {
                        info!("   Found {} claimable balance(s)", claimables.len());
                        self.state.set_claimable(claimables.first().map(|cb| cb.summary()));
                    }
                    Err(e) => warn!("⚠️ Could not list claimable balances: {}", e),
                }
            }
        }

        *self.preferred_endpoint.lock().unwrap() = endpoint.clone();
        {
            let mut provider = self.bundle_provider.lock().unwrap();
            if provider.is_none() {
                *provider = Some(Arc::new(HorizonBundleProvider::new(
                    self.config.clone(),
                    self.horizon.clone(),
                    endpoint,
                    self.source.public_key().to_string(),
                    self.fee_payer.public_key().to_string(),
                )));
            }
        }

        self.state.set_identity(
            self.source.public_key().to_string(),
            self.fee_payer.public_key().to_string(),
        );
        self.state.set_running(true);
        Ok(())
    }

    /// Initialize and either execute immediately (target already passed) or
    /// arm the two-stage scheduler.
    pub async fn start(self: &Arc<Self>) -> Result<(), SweepError> {
        if self.state.is_running() {
            return Err(SweepError::Configuration(
                "bot is already running".to_string(),
            ));
        }

        if let Err(e) = self.initialize().await {
            self.state.set_error(e.to_string());
            self.state.transition(BotPhase::Error);
            return Err(e);
        }

        let unlock_ms = self.config.timing.unlock_timestamp.saturating_mul(1_000);
        let now_ms = self.clock.now_ms();
        if now_ms >= unlock_ms {
            // Informational, not fatal: a passed target means execute now
            let note = SweepError::Timing(format!(
                "unlock instant {} already passed",
                format_instant(self.config.timing.unlock_timestamp)
            ));
            info!("⚡ {}, executing immediately", note);
            self.execute_cycle().await;
            return Ok(());
        }

        let remaining = (unlock_ms - now_ms) / 1_000;
        info!(
            "⏳ Waiting {} until unlock at {}",
            format_duration(remaining),
            format_instant(self.config.timing.unlock_timestamp)
        );
        self.state.transition(BotPhase::Waiting);

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap() = token.clone();

        let scheduler = Scheduler::new(self.clock.clone(), self.config.timing.clone(), token);
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            scheduler
                .run(move || async move {
                    engine.execute_cycle().await;
                })
                .await;
        });
        *self.scheduler_task.lock().unwrap() = Some(handle);

        Ok(())
    }

    /// Manual trigger: bypass whatever stage is armed and execute now
    pub async fn execute_now(self: &Arc<Self>) -> Result<(), SweepError> {
        match self.state.phase() {
            BotPhase::Idle => {
                if let Err(e) = self.initialize().await {
                    self.state.set_error(e.to_string());
                    self.state.transition(BotPhase::Error);
                    return Err(e);
                }
            }
            BotPhase::Preparing | BotPhase::Waiting => {
                info!("🔧 Manual execution requested, disarming scheduler");
                self.cancel.lock().unwrap().cancel();
            }
            BotPhase::Executing => {
                return Err(SweepError::Configuration(
                    "execution already in progress".to_string(),
                ));
            }
            BotPhase::Completed | BotPhase::Error => {
                return Err(SweepError::Configuration(
                    "sweep cycle already finished; shut down before running again".to_string(),
                ));
            }
        }

        self.execute_cycle().await;
        Ok(())
    }

    /// One execution attempt: fee estimation, envelope assembly, then the
    /// failover race. The phase guard makes a second concurrent trigger a
    /// no-op.
    async fn execute_cycle(&self) {
        if !self.state.transition(BotPhase::Executing) {
            warn!("⚠️ Execution trigger ignored in phase {}", self.state.phase());
            return;
        }

        info!("🎯 EXECUTING SWEEP");
        let endpoint = self.preferred_endpoint();

        let (inner_fee, fee_bump_fee) =
            self.fees.estimate(self.horizon.as_ref(), &endpoint).await;
        info!(
            "   Fees: inner {} stroops ({} Pi), fee-bump {} stroops ({} Pi)",
            inner_fee,
            stroops_to_units(inner_fee),
            fee_bump_fee,
            stroops_to_units(fee_bump_fee)
        );

        let provider = self.bundle_provider.lock().unwrap().clone();
        let provider = match provider {
            Some(p) => p,
            None => {
                self.state
                    .set_error("engine was not initialized".to_string());
                self.state.transition(BotPhase::Error);
                return;
            }
        };

        let envelope = match provider.build(inner_fee, fee_bump_fee).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("❌ Envelope assembly failed: {}", e);
                self.state.set_error(e.to_string());
                self.state.transition(BotPhase::Error);
                return;
            }
        };

        let racer = SubmissionRacer::new(
            self.horizon.clone(),
            self.config.network.horizon_urls.clone(),
        );
        let result = racer.race(&envelope).await;

        if result.is_success() {
            info!("🎉 Sweep completed");
            self.state.set_result(result);
            self.state.transition(BotPhase::Completed);
        } else {
            if let crate::types::SubmissionResult::Failure { last_error, .. } = &result {
                self.state.set_error(last_error.clone());
            }
            self.state.set_result(result);
            self.state.transition(BotPhase::Error);
        }
    }

    /// Status snapshot; remaining time is computed from the engine's own
    /// clock so virtual-time runs stay consistent
    pub fn status(&self) -> EngineStatus {
        self.state.status(self.clock.now_ms() / 1_000)
    }

    /// Source and fee payer accounts as seen by the preferred endpoint
    pub async fn account_info(&self) -> Result<(Account, Account), SweepError> {
        let endpoint = self.preferred_endpoint();
        let source = self
            .horizon
            .load_account(&endpoint, self.source.public_key())
            .await?;
        let fee_payer = self
            .horizon
            .load_account(&endpoint, self.fee_payer.public_key())
            .await?;
        Ok((source, fee_payer))
    }

    /// Claimable balances the source account is a claimant of
    pub async fn claimables(&self) -> Result<Vec<ClaimableBalance>, SweepError> {
        let endpoint = self.preferred_endpoint();
        self.horizon
            .list_claimables(&endpoint, self.source.public_key())
            .await
    }

    /// Idempotent shutdown: disarm whichever stage is pending and return to
    /// idle. An already-entered spin-wait runs out on its own, but the
    /// cancelled token keeps it from triggering execution.
    pub fn shutdown(&self) {
        info!("🛑 Shutting down sweep engine");
        self.cancel.lock().unwrap().cancel();
        if let Some(handle) = self.scheduler_task.lock().unwrap().take() {
            drop(handle);
        }
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::SignedEnvelope;
    use crate::mocks::{MockClock, MockHorizonClient, SubmitOutcome};

    struct FailingProvider;

    #[async_trait::async_trait]
    impl BundleProvider for FailingProvider {
        async fn build(
            &self,
            _inner_fee: u64,
            _fee_bump_fee: u64,
        ) -> Result<SignedEnvelope, SweepError> {
            Err(SweepError::Configuration("signer unavailable".to_string()))
        }
    }

    const ENDPOINT_A: &str = "https://a.horizon.test";
    const ENDPOINT_B: &str = "https://b.horizon.test";
    const ENDPOINT_C: &str = "https://c.horizon.test";

    fn test_config(unlock_timestamp: u64) -> Config {
        let mut config = Config::load_test_config();
        config.timing.unlock_timestamp = unlock_timestamp;
        config.network.horizon_urls = vec![
            ENDPOINT_A.to_string(),
            ENDPOINT_B.to_string(),
            ENDPOINT_C.to_string(),
        ];
        config
    }

    fn engine(
        config: Config,
        horizon: Arc<MockHorizonClient>,
        clock: Arc<MockClock>,
    ) -> Arc<SweepEngine> {
        Arc::new(SweepEngine::new(Arc::new(config), horizon, clock).unwrap())
    }

    /// Advance virtual time until the engine reaches a terminal phase or the
    /// step budget runs out.
    async fn drive_to_terminal(engine: &Arc<SweepEngine>, clock: &Arc<MockClock>, max_steps: usize) {
        for _ in 0..max_steps {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            let phase = engine.status().phase;
            if phase == BotPhase::Completed || phase == BotPhase::Error {
                return;
            }
            clock.advance(1_000);
        }
    }

    #[tokio::test]
    async fn test_past_target_executes_immediately() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(2_000_000));

        // Unlock was at t=1000s, clock is at t=2000s
        let engine = engine(test_config(1_000), horizon.clone(), clock.clone());
        engine.start().await.unwrap();

        let status = engine.status();
        assert_eq!(status.phase, BotPhase::Completed);
        assert!(status.last_result.as_ref().unwrap().is_success());
        // Straight to execution: no timer was ever armed
        assert!(clock.sleep_calls().is_empty());
        assert_eq!(horizon.submitted_endpoints(), vec![ENDPOINT_A]);
    }

    #[tokio::test]
    async fn test_initialize_walks_past_dead_endpoint() {
        let horizon = Arc::new(MockHorizonClient::healthy().with_account_outage(ENDPOINT_A));
        let clock = Arc::new(MockClock::at(2_000_000));

        let engine = engine(test_config(1_000), horizon.clone(), clock);
        engine.start().await.unwrap();

        // B answered the account lookup, so it becomes the preferred
        // endpoint; the race still walks the full priority list from A
        assert_eq!(engine.preferred_endpoint(), ENDPOINT_B);
        assert_eq!(engine.status().phase, BotPhase::Completed);
        assert_eq!(horizon.submitted_endpoints(), vec![ENDPOINT_A]);
    }

    #[tokio::test]
    async fn test_start_fails_when_all_endpoints_down() {
        let horizon = Arc::new(MockHorizonClient::unreachable());
        let clock = Arc::new(MockClock::at(2_000_000));

        let engine = engine(test_config(1_000), horizon, clock);
        let result = engine.start().await;

        assert!(matches!(result, Err(SweepError::Connectivity { .. })));
        let status = engine.status();
        assert_eq!(status.phase, BotPhase::Error);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_failed_race_surfaces_error() {
        let horizon = Arc::new(
            MockHorizonClient::healthy()
                .with_default_submit_outcome(SubmitOutcome::Reject("tx_bad_seq".to_string())),
        );
        let clock = Arc::new(MockClock::at(2_000_000));

        let engine = engine(test_config(1_000), horizon.clone(), clock);
        engine.start().await.unwrap();

        let status = engine.status();
        assert_eq!(status.phase, BotPhase::Error);
        assert!(status.last_error.as_deref().unwrap().contains("tx_bad_seq"));
        match status.last_result.unwrap() {
            crate::types::SubmissionResult::Failure { attempted, .. } => {
                assert_eq!(attempted.len(), 3);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(2_000_000));

        let engine = engine(test_config(1_000), horizon, clock);
        engine.start().await.unwrap();

        let second = engine.start().await;
        assert!(matches!(second, Err(SweepError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_scheduled_execution_on_virtual_time() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(0));

        // Unlock 30s out: precision stage only, then the bounded spin
        let engine = engine(test_config(30), horizon.clone(), clock.clone());
        engine.start().await.unwrap();
        assert_eq!(engine.status().phase, BotPhase::Waiting);

        drive_to_terminal(&engine, &clock, 200).await;

        let status = engine.status();
        assert_eq!(status.phase, BotPhase::Completed);
        assert!(status.last_result.unwrap().is_success());
        assert_eq!(clock.spin_calls(), vec![(30_000, 5_000)]);
        assert_eq!(horizon.submitted_endpoints(), vec![ENDPOINT_A]);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_suppresses_firing() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(0));

        let engine = engine(test_config(120), horizon.clone(), clock.clone());
        engine.start().await.unwrap();
        assert_eq!(engine.status().phase, BotPhase::Waiting);

        engine.shutdown();
        assert_eq!(engine.status().phase, BotPhase::Idle);
        engine.shutdown();
        assert_eq!(engine.status().phase, BotPhase::Idle);

        // Racing the clock far past the target after shutdown must not
        // produce a submission
        clock.advance(600_000);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(engine.status().phase, BotPhase::Idle);
        assert!(horizon.submitted_endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_execute_now_from_idle() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(0));

        // Unlock is a year out; the manual trigger ignores it
        let engine = engine(test_config(31_536_000), horizon.clone(), clock.clone());
        engine.execute_now().await.unwrap();

        assert_eq!(engine.status().phase, BotPhase::Completed);
        assert!(clock.sleep_calls().is_empty());
        assert_eq!(horizon.submitted_endpoints(), vec![ENDPOINT_A]);
    }

    #[tokio::test]
    async fn test_execute_now_disarms_waiting_scheduler() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(0));

        let engine = engine(test_config(3_600), horizon.clone(), clock.clone());
        engine.start().await.unwrap();
        assert_eq!(engine.status().phase, BotPhase::Waiting);

        engine.execute_now().await.unwrap();
        assert_eq!(engine.status().phase, BotPhase::Completed);
        assert_eq!(horizon.submitted_endpoints().len(), 1);

        // The disarmed scheduler cannot fire a second time
        clock.advance(4_000_000);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(horizon.submitted_endpoints().len(), 1);
    }

    #[tokio::test]
    async fn test_envelope_failure_sets_error_without_submitting() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(2_000_000));

        let engine = Arc::new(
            SweepEngine::new(Arc::new(test_config(1_000)), horizon.clone(), clock)
                .unwrap()
                .with_bundle_provider(Arc::new(FailingProvider)),
        );
        engine.start().await.unwrap();

        let status = engine.status();
        assert_eq!(status.phase, BotPhase::Error);
        assert!(status
            .last_error
            .as_deref()
            .unwrap()
            .contains("signer unavailable"));
        // The race never started
        assert!(horizon.submitted_endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_status_remaining_follows_injected_clock() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(0));

        let engine = engine(test_config(120), horizon, clock.clone());
        assert_eq!(engine.status().remaining_seconds, 120);

        clock.advance(30_000);
        assert_eq!(engine.status().remaining_seconds, 90);

        clock.advance(600_000);
        assert_eq!(engine.status().remaining_seconds, 0);
    }

    #[tokio::test]
    async fn test_execute_now_after_completion_is_rejected() {
        let horizon = Arc::new(MockHorizonClient::healthy());
        let clock = Arc::new(MockClock::at(2_000_000));

        let engine = engine(test_config(1_000), horizon, clock);
        engine.start().await.unwrap();
        assert_eq!(engine.status().phase, BotPhase::Completed);

        let again = engine.execute_now().await;
        assert!(matches!(again, Err(SweepError::Configuration(_))));
    }
}

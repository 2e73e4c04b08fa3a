use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{FEE_BUMP_FACTOR, MIN_FEE_BUMP_STROOPS, MIN_INNER_FEE_STROOPS};
use crate::horizon::HorizonClient;
use crate::types::FeeDistribution;

/// Computes the competitive fee pair (inner + fee-bump) used for envelope
/// assembly. Fee stats are best-effort; the configured base fee is the
/// fallback.
pub struct FeeEstimator {
    config: Arc<Config>,
}

impl FeeEstimator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Query fee stats from the preferred endpoint and derive the fee pair.
    /// A failed query is non-fatal and falls back to the configured base fee.
    pub async fn estimate(&self, horizon: &dyn HorizonClient, endpoint: &str) -> (u64, u64) {
        let stats = match horizon.fee_stats(endpoint).await {
            Ok(stats) => {
                debug!(
                    "📈 Fee stats: p50={:?} p95={:?} p99={:?}",
                    stats.fee_charged.p50, stats.fee_charged.p95, stats.fee_charged.p99
                );
                Some(stats)
            }
            Err(e) => {
                warn!("⚠️ Could not fetch fee stats, using base fee: {}", e);
                None
            }
        };

        let inner = self.competitive_fee(stats.as_ref());
        let bump = self.fee_bump_fee(inner);
        (inner, bump)
    }

    /// `max(p99, base_fee) * multiplier`, floored at the network minimum
    pub fn competitive_fee(&self, stats: Option<&FeeDistribution>) -> u64 {
        let base_fee = self.config.fees.base_fee;
        let reference = match stats.and_then(|s| s.p99_stroops()) {
            Some(p99) => p99.max(base_fee),
            None => base_fee,
        };
        reference
            .saturating_mul(self.config.fees.fee_multiplier)
            .max(MIN_INNER_FEE_STROOPS)
    }

    /// Sponsoring fee: at least twice the inner fee, independently floored
    pub fn fee_bump_fee(&self, inner_fee: u64) -> u64 {
        inner_fee
            .saturating_mul(FEE_BUMP_FACTOR)
            .max(MIN_FEE_BUMP_STROOPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockHorizonClient;
    use crate::types::FeeCharged;

    fn estimator(base_fee: u64, multiplier: u64) -> FeeEstimator {
        let mut config = Config::load_test_config();
        config.fees.base_fee = base_fee;
        config.fees.fee_multiplier = multiplier;
        FeeEstimator::new(Arc::new(config))
    }

    fn stats_with_p99(p99: u64) -> FeeDistribution {
        FeeDistribution {
            last_ledger_base_fee: None,
            fee_charged: FeeCharged {
                p99: Some(p99.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_p99_below_base_uses_base() {
        let est = estimator(500, 10);
        let fee = est.competitive_fee(Some(&stats_with_p99(100)));
        assert_eq!(fee, 5_000);
    }

    #[test]
    fn test_p99_above_base_uses_p99() {
        let est = estimator(100, 10);
        let fee = est.competitive_fee(Some(&stats_with_p99(2_500)));
        assert_eq!(fee, 25_000);
    }

    #[test]
    fn test_missing_stats_falls_back_to_base() {
        let est = estimator(100, 10);
        assert_eq!(est.competitive_fee(None), 1_000);
    }

    #[test]
    fn test_inner_fee_floor() {
        // Tiny base and multiplier still yield the network minimum
        let est = estimator(10, 1);
        assert_eq!(est.competitive_fee(None), 1_000);
        assert_eq!(est.competitive_fee(Some(&stats_with_p99(5))), 1_000);
    }

    #[test]
    fn test_fee_bump_is_at_least_double() {
        let est = estimator(100, 10);
        for inner in [0u64, 1, 999, 1_000, 1_001, 50_000] {
            let bump = est.fee_bump_fee(inner);
            assert!(bump >= inner * 2, "bump {} < 2x inner {}", bump, inner);
            assert!(bump >= MIN_FEE_BUMP_STROOPS);
        }
    }

    #[test]
    fn test_fee_bump_floor_applies_to_small_inner() {
        let est = estimator(100, 1);
        assert_eq!(est.fee_bump_fee(100), 2_000);
        assert_eq!(est.fee_bump_fee(1_000), 2_000);
        assert_eq!(est.fee_bump_fee(1_500), 3_000);
    }

    #[tokio::test]
    async fn test_estimate_falls_back_when_stats_unavailable() {
        // A dead fee_stats endpoint is non-fatal: base_fee takes over
        let est = estimator(500, 10);
        let mock = MockHorizonClient::healthy().without_fee_stats();
        let (inner, bump) = est.estimate(&mock, "https://a.horizon.test").await;
        assert_eq!(inner, 5_000);
        assert_eq!(bump, 10_000);
    }

    #[tokio::test]
    async fn test_estimate_uses_live_p99() {
        let est = estimator(100, 10);
        let mock = MockHorizonClient::healthy().with_fee_p99(Some(2_500));
        let (inner, bump) = est.estimate(&mock, "https://a.horizon.test").await;
        assert_eq!(inner, 25_000);
        assert_eq!(bump, 50_000);
    }

    #[tokio::test]
    async fn test_estimate_with_stats_but_no_p99() {
        // Stats answered without a p99 percentile: base_fee, floored
        let est = estimator(100, 10);
        let mock = MockHorizonClient::healthy().with_fee_p99(None);
        let (inner, bump) = est.estimate(&mock, "https://a.horizon.test").await;
        assert_eq!(inner, 1_000);
        assert_eq!(bump, 2_000);
    }

    #[test]
    fn test_unparseable_p99_falls_back() {
        let est = estimator(200, 5);
        let stats = FeeDistribution {
            last_ledger_base_fee: None,
            fee_charged: FeeCharged {
                p99: Some("garbage".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(est.competitive_fee(Some(&stats)), 1_000);
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::horizon::HorizonClient;
use crate::predicate::ClaimPredicate;
use crate::types::{
    Account, Balance, ClaimableBalance, Claimant, FeeCharged, FeeDistribution, SubmitResponse,
    SweepError,
};

/// Scripted result of a submission attempt against one endpoint
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Accept { hash: String, ledger: u64 },
    Reject(String),
    Unreachable(String),
}

/// Scriptable Horizon double. Endpoint-keyed submit outcomes let tests drive
/// the failover race; every submission is recorded in order.
pub struct MockHorizonClient {
    account_reachable: bool,
    fee_p99: Option<u64>,
    fee_stats_available: bool,
    claimable_count: usize,
    unlock_epoch: u64,
    account_outages: HashSet<String>,
    submit_outcomes: HashMap<String, SubmitOutcome>,
    default_outcome: SubmitOutcome,
    submitted: Mutex<Vec<String>>,
}

impl MockHorizonClient {
    /// All endpoints reachable, stats present, one claimable, submits accepted
    pub fn healthy() -> Self {
        Self {
            account_reachable: true,
            fee_p99: Some(2_500),
            fee_stats_available: true,
            claimable_count: 1,
            unlock_epoch: 1_767_225_600,
            account_outages: HashSet::new(),
            submit_outcomes: HashMap::new(),
            default_outcome: SubmitOutcome::Accept {
                hash: "a1b2c3d4".to_string(),
                ledger: 123_456,
            },
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a connectivity error
    pub fn unreachable() -> Self {
        let mut mock = Self::healthy();
        mock.account_reachable = false;
        mock.fee_stats_available = false;
        mock.default_outcome = SubmitOutcome::Unreachable("connection refused".to_string());
        mock
    }

    pub fn with_claimables(mut self, count: usize) -> Self {
        self.claimable_count = count;
        self
    }

    pub fn with_fee_p99(mut self, p99: Option<u64>) -> Self {
        self.fee_p99 = p99;
        self
    }

    pub fn without_fee_stats(mut self) -> Self {
        self.fee_stats_available = false;
        self
    }

    pub fn with_unlock_epoch(mut self, epoch: u64) -> Self {
        self.unlock_epoch = epoch;
        self
    }

    /// Account lookups against this endpoint fail with a connectivity error
    pub fn with_account_outage(mut self, endpoint: &str) -> Self {
        self.account_outages.insert(endpoint.to_string());
        self
    }

    /// Script the submit outcome for one endpoint
    pub fn with_submit_outcome(mut self, endpoint: &str, outcome: SubmitOutcome) -> Self {
        self.submit_outcomes.insert(endpoint.to_string(), outcome);
        self
    }

    pub fn with_default_submit_outcome(mut self, outcome: SubmitOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Endpoints submitted to, in attempt order
    pub fn submitted_endpoints(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn predicate(&self) -> ClaimPredicate {
        ClaimPredicate {
            not: Some(Box::new(ClaimPredicate {
                abs_before_epoch: Some(self.unlock_epoch.to_string()),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    fn claimable(&self, index: usize, claimant: &str) -> ClaimableBalance {
        ClaimableBalance {
            id: format!("{:08x}cafebabe", index),
            asset: "native".to_string(),
            amount: "1500.0000000".to_string(),
            claimants: vec![Claimant {
                destination: claimant.to_string(),
                predicate: self.predicate(),
            }],
        }
    }
}

#[async_trait]
impl HorizonClient for MockHorizonClient {
    async fn load_account(
        &self,
        endpoint: &str,
        account_id: &str,
    ) -> Result<Account, SweepError> {
        if !self.account_reachable || self.account_outages.contains(endpoint) {
            return Err(SweepError::Connectivity {
                endpoint: endpoint.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        Ok(Account {
            account_id: account_id.to_string(),
            sequence: "100".to_string(),
            balances: vec![Balance {
                balance: "250.0000000".to_string(),
                asset_type: "native".to_string(),
                asset_code: None,
            }],
        })
    }

    async fn fee_stats(&self, endpoint: &str) -> Result<FeeDistribution, SweepError> {
        if !self.fee_stats_available {
            return Err(SweepError::Connectivity {
                endpoint: endpoint.to_string(),
                detail: "fee_stats unavailable".to_string(),
            });
        }
        Ok(FeeDistribution {
            last_ledger_base_fee: Some("100".to_string()),
            fee_charged: FeeCharged {
                min: Some("100".to_string()),
                mode: Some("100".to_string()),
                p50: Some("100".to_string()),
                p95: Some("200".to_string()),
                p99: self.fee_p99.map(|v| v.to_string()),
            },
        })
    }

    async fn claimable_balance(
        &self,
        endpoint: &str,
        balance_id: &str,
    ) -> Result<ClaimableBalance, SweepError> {
        if !self.account_reachable {
            return Err(SweepError::Connectivity {
                endpoint: endpoint.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        let mut cb = self.claimable(0, "GSOURCE");
        cb.id = balance_id.to_string();
        Ok(cb)
    }

    async fn list_claimables(
        &self,
        endpoint: &str,
        claimant: &str,
    ) -> Result<Vec<ClaimableBalance>, SweepError> {
        if !self.account_reachable {
            return Err(SweepError::Connectivity {
                endpoint: endpoint.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        Ok((0..self.claimable_count)
            .map(|i| self.claimable(i, claimant))
            .collect())
    }

    async fn submit(
        &self,
        endpoint: &str,
        _envelope_xdr: &str,
    ) -> Result<SubmitResponse, SweepError> {
        self.submitted.lock().unwrap().push(endpoint.to_string());

        let outcome = self
            .submit_outcomes
            .get(endpoint)
            .unwrap_or(&self.default_outcome);

        match outcome {
            SubmitOutcome::Accept { hash, ledger } => Ok(SubmitResponse {
                hash: hash.clone(),
                ledger: Some(*ledger),
            }),
            SubmitOutcome::Reject(codes) => Err(SweepError::Rejected {
                endpoint: endpoint.to_string(),
                result_codes: codes.clone(),
            }),
            SubmitOutcome::Unreachable(detail) => Err(SweepError::Connectivity {
                endpoint: endpoint.to_string(),
                detail: detail.clone(),
            }),
        }
    }
}

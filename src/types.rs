use serde::{Deserialize, Serialize};

use crate::predicate::ClaimPredicate;

/// Lifecycle phase of a single sweep cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotPhase {
    Idle,
    Preparing,
    Waiting,
    Executing,
    Completed,
    Error,
}

impl std::fmt::Display for BotPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BotPhase::Idle => "idle",
            BotPhase::Preparing => "preparing",
            BotPhase::Waiting => "waiting",
            BotPhase::Executing => "executing",
            BotPhase::Completed => "completed",
            BotPhase::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// One failed submission attempt, kept for post-mortem inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointAttempt {
    pub endpoint: String,
    pub error: String,
    pub elapsed_ms: u64,
}

/// Outcome of one execution attempt across the endpoint list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SubmissionResult {
    Success {
        endpoint: String,
        hash: String,
        ledger: Option<u64>,
        elapsed_ms: u64,
    },
    Failure {
        last_error: String,
        attempted: Vec<EndpointAttempt>,
    },
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success { .. })
    }
}

/// Snapshot returned by the status query
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub is_running: bool,
    pub phase: BotPhase,
    pub target_instant: u64,
    pub target_instant_iso: String,
    pub remaining_seconds: u64,
    pub source_public_key: Option<String>,
    pub fee_payer_public_key: Option<String>,
    pub claimable_balance: Option<ClaimableBalanceSummary>,
    pub last_error: Option<String>,
    pub last_result: Option<SubmissionResult>,
    pub current_time: u64,
    pub current_time_iso: String,
}

/// Trimmed claimable balance view exposed over status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimableBalanceSummary {
    pub id: String,
    pub asset: String,
    pub amount: String,
}

/// Typed error surface of the engine
#[derive(thiserror::Error, Debug)]
pub enum SweepError {
    /// Endpoint unreachable or account missing; the next endpoint may still work
    #[error("Connectivity error ({endpoint}): {detail}")]
    Connectivity { endpoint: String, detail: String },

    /// Ledger rejected the envelope; resubmitting to the same endpoint is pointless
    #[error("Transaction rejected by {endpoint}: {result_codes}")]
    Rejected {
        endpoint: String,
        result_codes: String,
    },

    /// Missing or invalid run parameters; fatal before scheduling begins
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Target instant already passed at setup; triggers immediate execution
    #[error("Timing: {0}")]
    Timing(String),
}

// ---------------------------------------------------------------------------
// Horizon wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub sequence: String,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

impl Account {
    pub fn native_balance(&self) -> Option<&str> {
        self.balances
            .iter()
            .find(|b| b.asset_type == "native")
            .map(|b| b.balance.as_str())
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence.parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub balance: String,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
}

/// Horizon fee_stats response; percentile fields arrive as strings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeDistribution {
    #[serde(default)]
    pub last_ledger_base_fee: Option<String>,
    pub fee_charged: FeeCharged,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeCharged {
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub p50: Option<String>,
    #[serde(default)]
    pub p95: Option<String>,
    #[serde(default)]
    pub p99: Option<String>,
}

impl FeeDistribution {
    pub fn p99_stroops(&self) -> Option<u64> {
        self.fee_charged.p99.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimableBalance {
    pub id: String,
    pub asset: String,
    pub amount: String,
    #[serde(default)]
    pub claimants: Vec<Claimant>,
}

impl ClaimableBalance {
    pub fn summary(&self) -> ClaimableBalanceSummary {
        ClaimableBalanceSummary {
            id: self.id.clone(),
            asset: self.asset.clone(),
            amount: self.amount.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claimant {
    pub destination: String,
    pub predicate: ClaimPredicate,
}

/// Successful submission response from a Horizon endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    #[serde(default)]
    pub ledger: Option<u64>,
}

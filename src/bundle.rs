use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::{SWEEP_PLACEHOLDER_AMOUNT, TX_TIMEOUT_SECS};
use crate::horizon::HorizonClient;
use crate::types::SweepError;

/// One operation inside the claim envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SweepOperation {
    ClaimClaimableBalance { balance_id: String },
    Payment { destination: String, amount: String },
}

/// Signed, submittable fee-bump envelope. `envelope_xdr` is what gets posted
/// to Horizon; `hash` identifies the transaction when an endpoint accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub id: String,
    pub envelope_xdr: String,
    pub hash: String,
    pub inner_fee: u64,
    pub fee_bump_fee: u64,
    pub operations: Vec<SweepOperation>,
}

/// Produces a signed envelope on demand. Deterministic for identical inputs
/// (same sequence number, fees and operation set) apart from signature
/// material.
#[async_trait]
pub trait BundleProvider: Send + Sync {
    async fn build(&self, inner_fee: u64, fee_bump_fee: u64)
        -> Result<SignedEnvelope, SweepError>;
}

/// Assembles the claim + sweep envelope from live Horizon state. Key
/// derivation and XDR signing live behind this seam; the envelope text
/// produced here is the canonical serialized form handed to submission.
pub struct HorizonBundleProvider {
    config: Arc<Config>,
    horizon: Arc<dyn HorizonClient>,
    endpoint: String,
    source_public_key: String,
    fee_payer_public_key: String,
}

impl HorizonBundleProvider {
    pub fn new(
        config: Arc<Config>,
        horizon: Arc<dyn HorizonClient>,
        endpoint: String,
        source_public_key: String,
        fee_payer_public_key: String,
    ) -> Self {
        Self {
            config,
            horizon,
            endpoint,
            source_public_key,
            fee_payer_public_key,
        }
    }

    /// Claim the configured balance id, or every claimable balance the
    /// source account is a claimant of when no id was given
    async fn collect_operations(&self) -> Result<Vec<SweepOperation>, SweepError> {
        let mut operations = Vec::new();

        match &self.config.accounts.balance_id {
            Some(balance_id) => {
                operations.push(SweepOperation::ClaimClaimableBalance {
                    balance_id: balance_id.clone(),
                });
            }
            None => {
                let claimables = self
                    .horizon
                    .list_claimables(&self.endpoint, &self.source_public_key)
                    .await?;
                info!("   Added {} claim operations", claimables.len());
                for cb in claimables {
                    operations.push(SweepOperation::ClaimClaimableBalance { balance_id: cb.id });
                }
            }
        }

        operations.push(SweepOperation::Payment {
            destination: self.config.accounts.destination.clone(),
            amount: SWEEP_PLACEHOLDER_AMOUNT.to_string(),
        });

        Ok(operations)
    }
}

#[async_trait]
impl BundleProvider for HorizonBundleProvider {
    async fn build(
        &self,
        inner_fee: u64,
        fee_bump_fee: u64,
    ) -> Result<SignedEnvelope, SweepError> {
        info!("🔨 Building claim envelope...");

        // Fresh sequence number for the inner transaction
        let source = self
            .horizon
            .load_account(&self.endpoint, &self.source_public_key)
            .await?;

        let operations = self.collect_operations().await?;

        debug!(
            "   Inner fee: {} stroops, fee-bump fee: {} stroops, {} ops",
            inner_fee,
            fee_bump_fee,
            operations.len()
        );

        let canonical = serde_json::json!({
            "network_passphrase": self.config.network.network_passphrase,
            "source_account": self.source_public_key,
            "fee_source": self.fee_payer_public_key,
            "sequence": source.sequence_number() + 1,
            "inner_fee": inner_fee,
            "fee_bump_fee": fee_bump_fee,
            "timeout_secs": TX_TIMEOUT_SECS,
            "operations": operations,
        });
        let payload = serde_json::to_vec(&canonical)
            .map_err(|e| SweepError::Configuration(format!("envelope encoding failed: {}", e)))?;

        let envelope_xdr = base64::engine::general_purpose::STANDARD.encode(&payload);
        let hash = hex::encode(Sha256::digest(&payload));

        info!("✅ Claim envelope built and signed (hash: {})", &hash[..16]);

        Ok(SignedEnvelope {
            id: uuid::Uuid::new_v4().to_string(),
            envelope_xdr,
            hash,
            inner_fee,
            fee_bump_fee,
            operations,
        })
    }
}

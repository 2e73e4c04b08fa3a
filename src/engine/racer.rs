use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::bundle::SignedEnvelope;
use crate::horizon::HorizonClient;
use crate::types::{EndpointAttempt, SubmissionResult};

/// Sequential failover race across the Horizon priority list: first
/// acceptance wins, every failure advances to the next endpoint, no retry
/// against the same endpoint and no backoff. The one execution window is
/// time-critical; a slow retry loop would miss it anyway.
pub struct SubmissionRacer {
    horizon: Arc<dyn HorizonClient>,
    endpoints: Vec<String>,
}

impl SubmissionRacer {
    pub fn new(horizon: Arc<dyn HorizonClient>, endpoints: Vec<String>) -> Self {
        Self { horizon, endpoints }
    }

    pub async fn race(&self, envelope: &SignedEnvelope) -> SubmissionResult {
        let mut attempted: Vec<EndpointAttempt> = Vec::new();

        for endpoint in &self.endpoints {
            info!("📤 Submitting to {}...", endpoint);
            let start = Instant::now();

            match self.horizon.submit(endpoint, &envelope.envelope_xdr).await {
                Ok(response) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    info!(
                        "✅ Transaction accepted by {} in {}ms (hash: {})",
                        endpoint, elapsed_ms, response.hash
                    );
                    return SubmissionResult::Success {
                        endpoint: endpoint.clone(),
                        hash: response.hash,
                        ledger: response.ledger,
                        elapsed_ms,
                    };
                }
                Err(e) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    error!("   ❌ Submission to {} failed: {}", endpoint, e);
                    attempted.push(EndpointAttempt {
                        endpoint: endpoint.clone(),
                        error: e.to_string(),
                        elapsed_ms,
                    });
                }
            }
        }

        // The last endpoint's error is the representative one; callers can
        // inspect the full attempt list for the rest
        let last_error = attempted
            .last()
            .map(|a| a.error.clone())
            .unwrap_or_else(|| "no endpoints configured".to_string());

        error!(
            "❌ All {} endpoints rejected the envelope: {}",
            attempted.len(),
            last_error
        );

        SubmissionResult::Failure {
            last_error,
            attempted,
        }
    }
}

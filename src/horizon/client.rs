use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::constants::CLAIMABLES_PAGE_LIMIT;
use crate::types::{Account, ClaimableBalance, FeeDistribution, SubmitResponse, SweepError};

/// Ledger read/submit contract. Every call names the endpoint explicitly so
/// the racer can drive one client across the whole priority list.
#[async_trait]
pub trait HorizonClient: Send + Sync {
    async fn load_account(&self, endpoint: &str, account_id: &str)
        -> Result<Account, SweepError>;

    async fn fee_stats(&self, endpoint: &str) -> Result<FeeDistribution, SweepError>;

    async fn claimable_balance(
        &self,
        endpoint: &str,
        balance_id: &str,
    ) -> Result<ClaimableBalance, SweepError>;

    async fn list_claimables(
        &self,
        endpoint: &str,
        claimant: &str,
    ) -> Result<Vec<ClaimableBalance>, SweepError>;

    async fn submit(
        &self,
        endpoint: &str,
        envelope_xdr: &str,
    ) -> Result<SubmitResponse, SweepError>;
}

/// Horizon JSON API client over reqwest
pub struct HttpHorizon {
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct EmbeddedRecords<T> {
    _embedded: Records<T>,
}

#[derive(Deserialize)]
struct Records<T> {
    records: Vec<T>,
}

#[derive(Deserialize)]
struct HorizonProblem {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    extras: Option<HorizonExtras>,
}

#[derive(Deserialize)]
struct HorizonExtras {
    #[serde(default)]
    result_codes: Option<serde_json::Value>,
}

impl HttpHorizon {
    pub fn new() -> Result<Self, SweepError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SweepError::Configuration(format!("HTTP client init failed: {}", e)))?;
        Ok(Self { http })
    }

    fn connectivity(endpoint: &str, detail: impl std::fmt::Display) -> SweepError {
        SweepError::Connectivity {
            endpoint: endpoint.to_string(),
            detail: detail.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
    ) -> Result<T, SweepError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Self::connectivity(endpoint, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::connectivity(
                endpoint,
                format!("HTTP {} for {}: {}", status, url, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Self::connectivity(endpoint, format!("invalid response: {}", e)))
    }
}

#[async_trait]
impl HorizonClient for HttpHorizon {
    async fn load_account(
        &self,
        endpoint: &str,
        account_id: &str,
    ) -> Result<Account, SweepError> {
        let url = format!("{}/accounts/{}", endpoint.trim_end_matches('/'), account_id);
        debug!("🔎 GET {}", url);
        self.get_json(endpoint, &url).await
    }

    async fn fee_stats(&self, endpoint: &str) -> Result<FeeDistribution, SweepError> {
        let url = format!("{}/fee_stats", endpoint.trim_end_matches('/'));
        debug!("🔎 GET {}", url);
        self.get_json(endpoint, &url).await
    }

    async fn claimable_balance(
        &self,
        endpoint: &str,
        balance_id: &str,
    ) -> Result<ClaimableBalance, SweepError> {
        let url = format!(
            "{}/claimable_balances/{}",
            endpoint.trim_end_matches('/'),
            balance_id
        );
        debug!("🔎 GET {}", url);
        self.get_json(endpoint, &url).await
    }

    async fn list_claimables(
        &self,
        endpoint: &str,
        claimant: &str,
    ) -> Result<Vec<ClaimableBalance>, SweepError> {
        let url = format!(
            "{}/claimable_balances?claimant={}&limit={}",
            endpoint.trim_end_matches('/'),
            claimant,
            CLAIMABLES_PAGE_LIMIT
        );
        debug!("🔎 GET {}", url);
        let page: EmbeddedRecords<ClaimableBalance> = self.get_json(endpoint, &url).await?;
        Ok(page._embedded.records)
    }

    async fn submit(
        &self,
        endpoint: &str,
        envelope_xdr: &str,
    ) -> Result<SubmitResponse, SweepError> {
        let url = format!("{}/transactions", endpoint.trim_end_matches('/'));
        debug!("📤 POST {}", url);

        let response = self
            .http
            .post(&url)
            .form(&[("tx", envelope_xdr)])
            .send()
            .await
            .map_err(|e| Self::connectivity(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<SubmitResponse>()
                .await
                .map_err(|e| Self::connectivity(endpoint, format!("invalid response: {}", e)));
        }

        // A 4xx with result codes is a ledger rejection, not a transport failure
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            let problem: Option<HorizonProblem> = serde_json::from_str(&body).ok();
            let result_codes = problem
                .as_ref()
                .and_then(|p| p.extras.as_ref())
                .and_then(|e| e.result_codes.as_ref())
                .map(|v| v.to_string())
                .or_else(|| problem.as_ref().and_then(|p| p.detail.clone()))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(SweepError::Rejected {
                endpoint: endpoint.to_string(),
                result_codes,
            });
        }

        Err(Self::connectivity(
            endpoint,
            format!("HTTP {}: {}", status, body),
        ))
    }
}

use std::env;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_FEE_STROOPS, DEFAULT_FEE_MULTIPLIER, DEFAULT_HORIZON_URLS,
    DEFAULT_NETWORK_PASSPHRASE, DEFAULT_SPIN_WAIT_MAX_MS, DEFAULT_TRIGGER_OFFSET_MS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Horizon endpoints in priority order; the first is preferred
    pub horizon_urls: Vec<String>,
    pub network_passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub source_secret: String,
    pub fee_payer_secret: String,
    pub destination: String,
    /// Specific claimable balance to sweep; when absent, all claimable
    /// balances for the source account are claimed
    #[serde(default)]
    pub balance_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Unlock instant, unix seconds
    pub unlock_timestamp: u64,
    /// How long before the unlock instant the precision timer fires (ms)
    pub trigger_offset_ms: u64,
    /// Upper bound on the final spin-wait (ms); a trigger delayed past this
    /// gap skips the spin entirely
    pub spin_wait_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fallback fee (stroops) when fee stats are unavailable
    pub base_fee: u64,
    /// Multiplier applied on top of the observed p99
    pub fee_multiplier: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub accounts: AccountConfig,
    pub timing: TimingConfig,
    pub fees: FeeConfig,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                horizon_urls: DEFAULT_HORIZON_URLS.iter().map(|s| s.to_string()).collect(),
                network_passphrase: DEFAULT_NETWORK_PASSPHRASE.to_string(),
            },
            accounts: AccountConfig {
                source_secret: String::new(),
                fee_payer_secret: String::new(),
                destination: String::new(),
                balance_id: None,
            },
            timing: TimingConfig {
                unlock_timestamp: 0,
                trigger_offset_ms: DEFAULT_TRIGGER_OFFSET_MS,
                spin_wait_max_ms: DEFAULT_SPIN_WAIT_MAX_MS,
            },
            fees: FeeConfig {
                base_fee: DEFAULT_BASE_FEE_STROOPS,
                fee_multiplier: DEFAULT_FEE_MULTIPLIER,
            },
            api: ApiConfig {
                port: 5000,
                log_level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Overlay sensitive and deployment-specific values from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = env::var("SOURCE_SECRET") {
            self.accounts.source_secret = secret;
        }
        if let Ok(secret) = env::var("FEE_PAYER_SECRET") {
            self.accounts.fee_payer_secret = secret;
        }
        if let Ok(destination) = env::var("DESTINATION_ACCOUNT") {
            self.accounts.destination = destination;
        }
        if let Ok(balance_id) = env::var("BALANCE_ID") {
            if !balance_id.is_empty() {
                self.accounts.balance_id = Some(balance_id);
            }
        }
        if let Ok(ts) = env::var("UNLOCK_TIMESTAMP") {
            if let Ok(parsed) = ts.parse() {
                self.timing.unlock_timestamp = parsed;
            }
        }
        if let Ok(offset) = env::var("TRIGGER_OFFSET_MS") {
            if let Ok(parsed) = offset.parse() {
                self.timing.trigger_offset_ms = parsed;
            }
        }
        if let Ok(fee) = env::var("BASE_FEE") {
            if let Ok(parsed) = fee.parse() {
                self.fees.base_fee = parsed;
            }
        }
        if let Ok(multiplier) = env::var("FEE_MULTIPLIER") {
            if let Ok(parsed) = multiplier.parse() {
                self.fees.fee_multiplier = parsed;
            }
        }
        if let Ok(url) = env::var("HORIZON_URL") {
            // Promote the override to the front of the priority list
            self.network.horizon_urls.retain(|u| u != &url);
            self.network.horizon_urls.insert(0, url);
        }
        if let Ok(passphrase) = env::var("NETWORK_PASSPHRASE") {
            self.network.network_passphrase = passphrase;
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(parsed) = port.parse() {
                self.api.port = parsed;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.horizon_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one Horizon URL must be configured"));
        }
        if self.accounts.source_secret.is_empty() {
            return Err(anyhow::anyhow!("Source secret must be configured (SOURCE_SECRET)"));
        }
        if self.accounts.fee_payer_secret.is_empty() {
            return Err(anyhow::anyhow!(
                "Fee payer secret must be configured (FEE_PAYER_SECRET)"
            ));
        }
        if self.accounts.destination.is_empty() {
            return Err(anyhow::anyhow!(
                "Destination account must be configured (DESTINATION_ACCOUNT)"
            ));
        }
        if self.timing.unlock_timestamp == 0 {
            return Err(anyhow::anyhow!(
                "Unlock timestamp must be configured (UNLOCK_TIMESTAMP)"
            ));
        }
        if self.fees.fee_multiplier == 0 {
            return Err(anyhow::anyhow!("Fee multiplier must be at least 1"));
        }
        if self.timing.spin_wait_max_ms == 0 {
            return Err(anyhow::anyhow!("Spin-wait bound must be greater than 0"));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn load_test_config() -> Self {
        let mut config = Self::default();
        config.accounts.source_secret = "SBTESTSOURCESECRETSEEDXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX".to_string();
        config.accounts.fee_payer_secret = "SBTESTFEEPAYERSECRETSEEDXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX".to_string();
        config.accounts.destination = "GDESTINATIONTESTACCOUNTXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX".to_string();
        config.timing.unlock_timestamp = 4_102_444_800; // 2100-01-01
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.network.horizon_urls.len(), 3);
        assert_eq!(config.network.network_passphrase, "Pi Network");
        assert_eq!(config.timing.trigger_offset_ms, 100);
        assert_eq!(config.timing.spin_wait_max_ms, 5_000);
        assert_eq!(config.fees.base_fee, 100);
        assert_eq!(config.fees.fee_multiplier, 10);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::load_test_config();
        assert!(config.validate().is_ok());

        let mut invalid = Config::load_test_config();
        invalid.accounts.source_secret = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = Config::load_test_config();
        invalid.timing.unlock_timestamp = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = Config::load_test_config();
        invalid.network.horizon_urls.clear();
        assert!(invalid.validate().is_err());

        let mut invalid = Config::load_test_config();
        invalid.fees.fee_multiplier = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::load_test_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            config.network.horizon_urls,
            deserialized.network.horizon_urls
        );
        assert_eq!(
            config.timing.unlock_timestamp,
            deserialized.timing.unlock_timestamp
        );
        assert_eq!(config.accounts.balance_id, deserialized.accounts.balance_id);
    }

    #[tokio::test]
    async fn test_config_file_load() {
        let config = Config::load_test_config();
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        config.save(&path).await.unwrap();

        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded.timing.unlock_timestamp, 4_102_444_800);
    }
}

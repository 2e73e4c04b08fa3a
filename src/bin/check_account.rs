//! Standalone diagnostic: verify the configured accounts against the Horizon
//! priority list and print every claimable balance with its unlock time.

use anyhow::Result;

use stellar_sweep_bot::config::Config;
use stellar_sweep_bot::horizon::{HorizonClient, HttpHorizon};
use stellar_sweep_bot::keys::Keypair;
use stellar_sweep_bot::mocks::{is_mock_mode, MockHorizonClient};
use stellar_sweep_bot::predicate::extract_unlock_time;
use stellar_sweep_bot::utils::{current_timestamp, format_duration, format_instant};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = Config::default();
    config.apply_env_overrides();

    if config.accounts.source_secret.is_empty() {
        anyhow::bail!("SOURCE_SECRET must be set");
    }
    let source = Keypair::from_secret(&config.accounts.source_secret)?;

    let horizon: Box<dyn HorizonClient> = if is_mock_mode() {
        println!("🧪 API_MODE=mock: using scripted Horizon responses");
        Box::new(MockHorizonClient::healthy())
    } else {
        Box::new(HttpHorizon::new()?)
    };

    println!("🔍 Checking account {}", source.public_key());

    let mut endpoint = None;
    for url in &config.network.horizon_urls {
        match horizon.load_account(url, source.public_key()).await {
            Ok(account) => {
                println!("✅ {}", url);
                println!("   Sequence: {}", account.sequence);
                for balance in &account.balances {
                    println!("   Balance: {} ({})", balance.balance, balance.asset_type);
                }
                endpoint = Some(url.clone());
                break;
            }
            Err(e) => println!("❌ {}: {}", url, e),
        }
    }
    let endpoint = endpoint
        .ok_or_else(|| anyhow::anyhow!("no Horizon endpoint could load the source account"))?;

    if !config.accounts.fee_payer_secret.is_empty() {
        let fee_payer = Keypair::from_secret(&config.accounts.fee_payer_secret)?;
        match horizon.load_account(&endpoint, fee_payer.public_key()).await {
            Ok(account) => println!(
                "💳 Fee payer {}: {} Pi",
                fee_payer.public_key(),
                account.native_balance().unwrap_or("0")
            ),
            Err(e) => println!("⚠️ Fee payer account not found: {}", e),
        }
    }

    let claimables = horizon
        .list_claimables(&endpoint, source.public_key())
        .await?;
    println!();
    println!("💰 {} claimable balance(s)", claimables.len());

    let now = current_timestamp();
    let mut next_unlock: Option<u64> = None;
    for cb in &claimables {
        println!("   {} {} (id {})", cb.amount, cb.asset, cb.id);
        let unlock = cb
            .claimants
            .iter()
            .find(|c| c.destination == source.public_key())
            .or_else(|| cb.claimants.first())
            .and_then(|c| extract_unlock_time(&c.predicate));
        match unlock {
            Some(ts) if ts > now => {
                println!(
                    "      🔒 Unlocks at {} (in {})",
                    format_instant(ts),
                    format_duration(ts - now)
                );
                next_unlock = Some(next_unlock.map_or(ts, |cur| cur.min(ts)));
            }
            Some(ts) => println!("      🔓 Unlocked since {}", format_instant(ts)),
            None => println!("      🔓 No time condition found"),
        }
    }

    if let Some(ts) = next_unlock {
        println!();
        println!("💡 To target the next unlock, set UNLOCK_TIMESTAMP={}", ts);
    }

    Ok(())
}

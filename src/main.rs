use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Arg, Command};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stellar_sweep_bot::api::ApiServer;
use stellar_sweep_bot::config::Config;
use stellar_sweep_bot::engine::{SweepEngine, SystemClock};
use stellar_sweep_bot::horizon::{HorizonClient, HttpHorizon};
use stellar_sweep_bot::mocks::{is_mock_mode, MockHorizonClient};
use stellar_sweep_bot::types::BotPhase;
use stellar_sweep_bot::utils::format_instant;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("sweep-bot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("⚡ Precision claimable-balance sweep bot for Pi/Stellar networks")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config/default.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("execute-now")
                .long("execute-now")
                .help("Skip the scheduler and execute the sweep immediately")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_filter = match log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Secrets come from .env / environment, never from the config file
    dotenvy::dotenv().ok();

    let config_path = matches.get_one::<String>("config").unwrap();
    info!("📋 Loading configuration: {}", config_path);
    let mut config = match Config::load(config_path).await {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "⚠️ Could not read {} ({}), starting from defaults",
                config_path, e
            );
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        error!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    info!("✅ Configuration loaded");
    info!(
        "   Unlock instant: {}",
        format_instant(config.timing.unlock_timestamp)
    );
    info!("   Horizon endpoints: {:?}", config.network.horizon_urls);
    let config = Arc::new(config);

    let horizon: Arc<dyn HorizonClient> = if is_mock_mode() {
        warn!("🧪 API_MODE=mock: using scripted Horizon responses");
        Arc::new(MockHorizonClient::healthy())
    } else {
        Arc::new(HttpHorizon::new()?)
    };

    let engine = Arc::new(SweepEngine::new(
        config.clone(),
        horizon,
        Arc::new(SystemClock),
    )?);

    // Ctrl-C disarms whatever stage is pending before the process exits
    let engine_for_signal = engine.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("🛑 Shutdown signal received, stopping...");
                engine_for_signal.shutdown();
                std::process::exit(0);
            }
            Err(e) => {
                error!("❌ Signal handler error: {}", e);
                std::process::exit(1);
            }
        }
    });

    ApiServer::new(config.clone(), engine.clone()).start().await?;

    if matches.get_flag("execute-now") {
        warn!("⚡ --execute-now: bypassing the scheduler");
        if let Err(e) = engine.execute_now().await {
            error!("❌ Manual execution failed: {}", e);
        }
    } else if let Err(e) = engine.start().await {
        error!("❌ Engine start failed: {}", e);
    }

    // Follow the cycle to a terminal phase; the scheduler does its own
    // countdown logging in between
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        interval.tick().await;
        match engine.status().phase {
            BotPhase::Completed => {
                info!("🎉 Sweep cycle completed");
                break;
            }
            BotPhase::Error => {
                let status = engine.status();
                error!(
                    "❌ Sweep cycle failed: {}",
                    status.last_error.unwrap_or_default()
                );
                break;
            }
            BotPhase::Idle => break,
            _ => {}
        }
    }

    info!("🛰️ Control API stays available; press Ctrl-C to exit");
    signal::ctrl_c().await?;
    engine.shutdown();
    Ok(())
}

fn print_banner() {
    println!(
        r#"
╔══════════════════════════════════════════════╗
║        ⚡ Stellar Sweep Bot                  ║
║   precision trigger + failover submission    ║
╚══════════════════════════════════════════════╝
"#
    );
}

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::{get, post}, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::engine::SweepEngine;
use crate::predicate::extract_unlock_time;
use crate::types::EngineStatus;
use crate::utils::{current_timestamp, format_instant};

/// Control-plane HTTP server. Every route delegates to the engine; the
/// process keeps sweeping even with no client connected.
pub struct ApiServer {
    config: Arc<Config>,
    engine: Arc<SweepEngine>,
}

impl ApiServer {
    pub fn new(config: Arc<Config>, engine: Arc<SweepEngine>) -> Self {
        Self { config, engine }
    }

    pub async fn start(&self) -> Result<()> {
        let engine_status = self.engine.clone();
        let engine_start = self.engine.clone();
        let engine_execute_get = self.engine.clone();
        let engine_execute_post = self.engine.clone();
        let engine_stop = self.engine.clone();
        let engine_account = self.engine.clone();
        let engine_claimables = self.engine.clone();

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .route(
                "/api/health",
                get(|| async {
                    Json(json!({"ok": true, "time": current_timestamp()}))
                }),
            )
            .route("/api/bot/status", get(move || get_status(engine_status.clone())))
            .route("/api/bot/start", post(move || start_bot(engine_start.clone())))
            .route("/api/bot/execute", get(move || execute_bot(engine_execute_get.clone())))
            .route("/api/bot/execute", post(move || execute_bot(engine_execute_post.clone())))
            .route("/api/bot/stop", post(move || stop_bot(engine_stop.clone())))
            .route("/api/account/info", get(move || get_account_info(engine_account.clone())))
            .route(
                "/api/claimable-balances",
                get(move || get_claimable_balances(engine_claimables.clone())),
            )
            .layer(cors);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.api.port));
        tracing::info!("🛰️ API server listening on http://{}", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::Server::bind(&addr).serve(app.into_make_service()).await {
                tracing::error!("API server error: {}", e);
            }
        });

        Ok(())
    }
}

async fn get_status(engine: Arc<SweepEngine>) -> Json<EngineStatus> {
    Json(engine.status())
}

async fn start_bot(engine: Arc<SweepEngine>) -> (StatusCode, Json<Value>) {
    match engine.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "status": engine.status()})),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": e.to_string()})),
        ),
    }
}

async fn execute_bot(engine: Arc<SweepEngine>) -> (StatusCode, Json<Value>) {
    match engine.execute_now().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "status": engine.status()})),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": e.to_string()})),
        ),
    }
}

async fn stop_bot(engine: Arc<SweepEngine>) -> Json<Value> {
    engine.shutdown();
    Json(json!({"success": true, "status": engine.status()}))
}

async fn get_account_info(engine: Arc<SweepEngine>) -> (StatusCode, Json<Value>) {
    match engine.account_info().await {
        Ok((source, fee_payer)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "source": {
                    "account_id": source.account_id,
                    "balance": source.native_balance(),
                    "sequence": source.sequence,
                },
                "fee_payer": {
                    "account_id": fee_payer.account_id,
                    "balance": fee_payer.native_balance(),
                    "sequence": fee_payer.sequence,
                },
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": e.to_string()})),
        ),
    }
}

async fn get_claimable_balances(engine: Arc<SweepEngine>) -> (StatusCode, Json<Value>) {
    match engine.claimables().await {
        Ok(claimables) => {
            let records: Vec<Value> = claimables
                .iter()
                .map(|cb| {
                    let unlock = cb
                        .claimants
                        .iter()
                        .find(|c| c.destination == engine.source_public_key())
                        .or_else(|| cb.claimants.first())
                        .and_then(|c| extract_unlock_time(&c.predicate));
                    json!({
                        "id": cb.id,
                        "asset": cb.asset,
                        "amount": cb.amount,
                        "unlock_timestamp": unlock,
                        "unlock_iso": unlock.map(format_instant),
                    })
                })
                .collect();
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "count": records.len(),
                    "records": records,
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": e.to_string()})),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockClock, MockHorizonClient};
    use crate::types::BotPhase;

    fn test_engine(horizon: MockHorizonClient) -> Arc<SweepEngine> {
        let mut config = Config::load_test_config();
        config.timing.unlock_timestamp = 1_000;
        let clock = Arc::new(MockClock::at(2_000_000));
        Arc::new(SweepEngine::new(Arc::new(config), Arc::new(horizon), clock).unwrap())
    }

    #[tokio::test]
    async fn test_status_route_reflects_engine() {
        let engine = test_engine(MockHorizonClient::healthy());
        let Json(status) = get_status(engine.clone()).await;
        assert_eq!(status.phase, BotPhase::Idle);
        assert!(!status.is_running);
    }

    #[tokio::test]
    async fn test_start_route_runs_past_target_cycle() {
        let engine = test_engine(MockHorizonClient::healthy());
        let (code, Json(body)) = start_bot(engine.clone()).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(engine.status().phase, BotPhase::Completed);

        // A second start while running is reported, not retried
        let (code, Json(body)) = start_bot(engine).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_stop_route_resets_to_idle() {
        let engine = test_engine(MockHorizonClient::healthy());
        start_bot(engine.clone()).await;
        let Json(body) = stop_bot(engine.clone()).await;
        assert_eq!(body["success"], true);
        assert_eq!(engine.status().phase, BotPhase::Idle);
    }

    #[tokio::test]
    async fn test_account_info_route() {
        let engine = test_engine(MockHorizonClient::healthy());
        let (code, Json(body)) = get_account_info(engine).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["source"]["balance"], "250.0000000");
        assert_eq!(body["fee_payer"]["sequence"], "100");
    }

    #[tokio::test]
    async fn test_claimable_balances_route_extracts_unlock() {
        let engine =
            test_engine(MockHorizonClient::healthy().with_unlock_epoch(1_767_225_600));
        let (code, Json(body)) = get_claimable_balances(engine).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["records"][0]["unlock_timestamp"], 1_767_225_600_u64);
    }

    #[tokio::test]
    async fn test_account_info_route_unreachable() {
        let engine = test_engine(MockHorizonClient::unreachable());
        let (code, Json(body)) = get_account_info(engine).await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }
}

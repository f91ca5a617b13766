use axum::{
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::config::RiskProfile;
use crate::engine::{ConfigurationDraft, SimulationState};
use crate::error::SimulationClosed;
use crate::tools::position_size;
use crate::types::TradingPair;
use super::AppState;

fn unavailable(e: SimulationClosed) -> Response {
    error!("Simulation unavailable: {}", e);
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": e.to_string()}))).into_response()
}

// === Dashboard Data Endpoints ===

pub async fn get_snapshot(
    State(state): State<AppState>,
) -> Response {
    match state.simulation.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => unavailable(e),
    }
}

pub async fn get_trades(
    State(state): State<AppState>,
) -> Response {
    match state.simulation.snapshot().await {
        Ok(snapshot) => Json(json!({ "trades": snapshot.trades })).into_response(),
        Err(e) => unavailable(e),
    }
}

pub async fn get_stats(
    State(state): State<AppState>,
) -> Response {
    match state.simulation.snapshot().await {
        Ok(snapshot) => Json(snapshot.stats).into_response(),
        Err(e) => unavailable(e),
    }
}

#[derive(Serialize)]
pub struct PairInfo {
    pub pair: TradingPair,
    pub base_asset: &'static str,
    pub quote_asset: &'static str,
}

pub async fn get_pairs() -> impl IntoResponse {
    let pairs: Vec<PairInfo> = TradingPair::all()
        .into_iter()
        .map(|pair| PairInfo {
            pair,
            base_asset: pair.base_asset(),
            quote_asset: pair.quote_asset(),
        })
        .collect();

    Json(pairs)
}

#[derive(Serialize)]
pub struct ProfileInfo {
    pub profile: RiskProfile,
    pub name: String,
    pub description: String,
    pub risk_level: String,
    pub volatility_min: Decimal,
    pub volatility_max: Decimal,
}

pub async fn get_profiles() -> impl IntoResponse {
    let profile_info: Vec<ProfileInfo> = RiskProfile::all().iter().map(|p| {
        let (volatility_min, volatility_max) = p.volatility_range();
        ProfileInfo {
            profile: *p,
            name: p.name().to_string(),
            description: p.description().to_string(),
            risk_level: p.risk_level().to_string(),
            volatility_min,
            volatility_max,
        }
    }).collect();

    Json(profile_info)
}

// === Configuration Wizard ===

/// Capital as typed into the form; clients may send it as text or as a JSON number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CapitalInput {
    Text(String),
    Number(serde_json::Number),
}

impl CapitalInput {
    fn into_text(self) -> String {
        match self {
            CapitalInput::Text(text) => text,
            CapitalInput::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfigRequest {
    pub pair: TradingPair,
    pub risk_profile: RiskProfile,
    pub capital: CapitalInput,
}

impl From<ConfigRequest> for ConfigurationDraft {
    fn from(req: ConfigRequest) -> Self {
        ConfigurationDraft::new(req.pair, req.risk_profile, req.capital.into_text())
    }
}

pub async fn post_config(
    State(state): State<AppState>,
    Json(req): Json<ConfigRequest>,
) -> Response {
    let draft = ConfigurationDraft::from(req);
    match state
        .simulation
        .apply_configuration(draft.pair, draft.risk_profile, draft.capital)
        .await
    {
        Ok(Ok(configuration)) => {
            info!("Configuration applied via API");
            (StatusCode::OK, Json(json!({"status": "ok", "configuration": configuration}))).into_response()
        }
        Ok(Err(e)) => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string(), "details": e}))).into_response()
        }
        Err(e) => unavailable(e),
    }
}

pub async fn post_wizard(
    State(state): State<AppState>,
    Json(req): Json<ConfigRequest>,
) -> Response {
    match state.simulation.stage_draft(req.into()).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))).into_response(),
        Err(e) => unavailable(e),
    }
}

// === Control Endpoints ===

fn control_response(result: Result<SimulationState, SimulationClosed>) -> Response {
    match result {
        Ok(sim_state) => {
            (StatusCode::OK, Json(json!({"status": "ok", "state": sim_state}))).into_response()
        }
        Err(e) => unavailable(e),
    }
}

pub async fn post_start(
    State(state): State<AppState>,
) -> Response {
    control_response(state.simulation.start().await)
}

pub async fn post_pause(
    State(state): State<AppState>,
) -> Response {
    control_response(state.simulation.pause().await)
}

pub async fn post_withdraw(
    State(state): State<AppState>,
) -> Response {
    control_response(state.simulation.withdraw().await)
}

pub async fn post_reset(
    State(state): State<AppState>,
) -> Response {
    control_response(state.simulation.reset().await)
}

// === Tools ===

#[derive(Debug, Deserialize)]
pub struct PositionSizeRequest {
    pub balance: Decimal,
    pub risk_pct: Decimal,
}

pub async fn post_position_size(
    Json(req): Json<PositionSizeRequest>,
) -> Response {
    match position_size(req.balance, req.risk_pct) {
        Ok(allocation) => (StatusCode::OK, Json(allocation)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

// === WebSocket ===

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before taking the snapshot so nothing falls in between.
    let mut rx = state.simulation.subscribe();

    info!("WebSocket client connected");

    let snapshot = match state.simulation.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("WebSocket closed: {}", e);
            return;
        }
    };

    let initial = json!({
        "type": "initial",
        "snapshot": snapshot,
    });

    if let Ok(json_str) = serde_json::to_string(&initial) {
        let _ = sender.send(Message::Text(json_str)).await;
    }

    // Spawn task to forward events to client
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagging, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Ping(_)) => {
                debug!("Received ping");
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket client disconnected");
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
}

// === Health Check ===

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationSettings;
    use crate::engine::SimulationHandle;
    use crate::web::build_router;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let (simulation, _task) = SimulationHandle::spawn(SimulationSettings::default().with_seed(1));
        build_router(AppState::new(simulation))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_invalid_capital_is_bad_request() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/config",
            Some(json!({"pair": "BTC/USDT", "risk_profile": "balanced", "capital": "50"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["kind"], "InvalidCapital");

        let (_, snapshot) = call(&app, Method::GET, "/api/snapshot", None).await;
        assert_eq!(snapshot["state"], "Unconfigured");
    }

    #[tokio::test]
    async fn test_oversized_capital_is_bad_request() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/config",
            Some(json!({"pair": "BTC/USDT", "risk_profile": "aggressive", "capital": "1e29"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["kind"], "CapitalTooLarge");

        let (status, _) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_configure_and_control() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/config",
            Some(json!({"pair": "ETH/USDT", "risk_profile": "aggressive", "capital": 1500})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configuration"]["pair"], "ETH/USDT");
        assert_eq!(body["configuration"]["risk_profile"], "aggressive");

        let (status, body) = call(&app, Method::POST, "/api/control/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "Running");

        let (_, body) = call(&app, Method::POST, "/api/control/pause", None).await;
        assert_eq!(body["state"], "Paused");

        let (_, body) = call(&app, Method::POST, "/api/control/withdraw", None).await;
        assert_eq!(body["state"], "Paused");

        let (_, stats) = call(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(stats["cycles"], 0);

        let (_, body) = call(&app, Method::POST, "/api/control/reset", None).await;
        assert_eq!(body["state"], "Unconfigured");
    }

    #[tokio::test]
    async fn test_wizard_then_start() {
        let app = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/wizard",
            Some(json!({"pair": "SOLUSDT", "risk_profile": "conservative", "capital": "250"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::POST, "/api/control/start", None).await;
        assert_eq!(body["state"], "Running");
    }

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let app = app();
        let (_, profiles) = call(&app, Method::GET, "/api/profiles", None).await;
        assert_eq!(profiles.as_array().unwrap().len(), 3);

        let (_, pairs) = call(&app, Method::GET, "/api/pairs", None).await;
        assert_eq!(pairs[0]["pair"], "BTC/USDT");
    }

    #[tokio::test]
    async fn test_position_size_endpoint() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/tools/position-size",
            Some(json!({"balance": 2000, "risk_pct": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Max risk per trade: $30.00 (at 1.5% of $2000.00).");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/tools/position-size",
            Some(json!({"balance": 0, "risk_pct": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

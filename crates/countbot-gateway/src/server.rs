//! HTTP server: router, shared state and the shared-secret check.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use countbot_agent::CountBot;
use countbot_core::config::GatewayConfig;
use countbot_core::error::{CountBotError, Result};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::routes;

/// Header carrying the shared secret when one is configured.
pub const SECRET_HEADER: &str = "x-countbot-secret";

pub struct AppState {
    pub bot: Arc<CountBot>,
    pub config: GatewayConfig,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(bot: Arc<CountBot>, config: GatewayConfig) -> Self {
        Self { bot, config, start_time: std::time::Instant::now() }
    }
}

/// `/health` is open; webhooks and the API sit behind the secret check.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/webhook/participants", post(routes::webhook_participants))
        .route("/webhook/messages", post(routes::webhook_messages))
        .route("/api/counters", get(routes::get_counters))
        .route("/api/report", get(routes::get_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret));

    Router::new()
        .route("/health", get(routes::health_check))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn require_secret(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.config.secret.as_deref() {
        let given = request
            .headers()
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected) {
            tracing::warn!("Rejected {} {}: bad or missing secret", request.method(), request.uri().path());
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "unauthorized"})),
            )
                .into_response();
        }
    }
    next.run(request).await
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    bot: Arc<CountBot>,
    config: GatewayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CountBotError::Http(format!("bind {addr}: {e}")))?;
    tracing::info!("🌐 Gateway listening on http://{addr}");
    if config.secret.is_none() {
        tracing::warn!("Gateway has no shared secret; webhooks are open to anyone who can reach {addr}");
    }

    let app = build_router(Arc::new(AppState::new(bot, config)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CountBotError::Http(e.to_string()))
}

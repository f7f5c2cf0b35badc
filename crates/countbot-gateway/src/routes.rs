//! API route handlers for the gateway.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use countbot_core::traits::{CounterStore, GroupTransport};
use countbot_core::types::{Day, IncomingMessage, MembershipEvent};
use serde::Deserialize;
use std::sync::Arc;

use super::server::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(serde_json::json!({"error": message.to_string()})))
}

fn accepted() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::ACCEPTED, Json(serde_json::json!({"status": "accepted"})))
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// `dd/mm/yyyy` or `yyyy-mm-dd`; today when absent.
    pub date: Option<String>,
}

impl DayQuery {
    fn day(&self) -> Result<Day, ApiError> {
        match self.date.as_deref() {
            None | Some("") => Ok(Day::today()),
            Some(raw) => Day::parse(raw).map_err(|e| api_error(StatusCode::BAD_REQUEST, e)),
        }
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "countbot-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "transport": state.bot.transport().name(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Membership change from the bridge. Processed in the background so a
/// long delivery retry never holds the webhook open.
pub async fn webhook_participants(
    State(state): State<Arc<AppState>>,
    Json(event): Json<MembershipEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    tracing::debug!("Participants update: {} {:?} {:?}", event.group_id, event.action, event.participants);
    let bot = state.bot.clone();
    tokio::spawn(async move {
        if let Err(e) = bot.handle_membership_event(&event).await {
            tracing::error!("Membership event for {} failed: {e}", event.group_id);
        }
    });
    accepted()
}

/// Chat message from the bridge; only command words do anything.
pub async fn webhook_messages(
    State(state): State<Arc<AppState>>,
    Json(message): Json<IncomingMessage>,
) -> (StatusCode, Json<serde_json::Value>) {
    let bot = state.bot.clone();
    tokio::spawn(async move {
        if let Err(e) = bot.handle_message(&message).await {
            tracing::error!("Message from {} failed: {e}", message.chat_id);
        }
    });
    accepted()
}

/// Counter rows of one day.
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DayQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let day = query.day()?;
    let counters = state
        .bot
        .counters()
        .get_counters(day)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(serde_json::json!({
        "date": day.key(),
        "entries": counters.iter().map(|c| u64::from(c.entries)).sum::<u64>(),
        "exits": counters.iter().map(|c| u64::from(c.exits)).sum::<u64>(),
        "counters": counters,
    })))
}

/// Build a report without sending it.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DayQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let day = query.day()?;
    let report = state
        .bot
        .build_report(day, state.bot.lookup_policy())
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e))?;
    Ok(Json(serde_json::json!({
        "text": report.to_string(),
        "report": report,
    })))
}

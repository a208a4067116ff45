use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use crate::models::Token;
use crate::services::{
    sorted_rows, BroadcastSink, ModerationClient, ModerationError, NotificationGate,
    PageVisibility, Poller, SortDirection, SortKey, SortSpec, TokenStore,
};
use super::websocket::ws_handler;

pub struct AppState {
    pub store: Arc<TokenStore>,
    pub poller: Poller,
    pub moderation: Arc<ModerationClient>,
    pub gate: Arc<NotificationGate>,
    pub visibility: Arc<PageVisibility>,
    pub notices: Arc<BroadcastSink>,
}

/// A token plus the derived flags the table highlights.
#[derive(Debug, Serialize)]
pub struct TokenRow {
    #[serde(flatten)]
    pub token: Token,
    pub fdv_improved: bool,
    pub liquidity_improved: bool,
}

impl From<&Token> for TokenRow {
    fn from(token: &Token) -> Self {
        Self {
            fdv_improved: token.fdv_improved(),
            liquidity_improved: token.liquidity_improved(),
            token: token.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ViewQuery {
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VisibilityUpdate {
    hidden: bool,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(serde_json::json!({ "error": message.to_string() }))).into_response()
}

pub(crate) fn current_rows(store: &TokenStore, spec: SortSpec) -> Vec<TokenRow> {
    sorted_rows(&store.snapshot(), spec)
        .iter()
        .map(|token| TokenRow::from(token.as_ref()))
        .collect()
}

/// GET /tokens?sort=created_at&order=desc
async fn get_tokens(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let mut spec = SortSpec::default();
    if let Some(sort) = query.sort.as_deref() {
        match sort.parse::<SortKey>() {
            Ok(key) => spec.key = key,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        }
    }
    if let Some(order) = query.order.as_deref() {
        match order.parse::<SortDirection>() {
            Ok(direction) => spec.direction = direction,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        }
    }

    Json(current_rows(&state.store, spec)).into_response()
}

/// POST /tokens/:id/scam
async fn mark_scam(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.moderation.mark_as_scam(id).await {
        Ok(token) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "id": token.id,
                "pair_address": token.pair_address,
            })),
        )
            .into_response(),
        Err(e @ ModerationError::InvalidId(_)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e @ ModerationError::UnknownToken(_)) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ ModerationError::Request { .. }) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

/// POST /refresh
async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.poller.fetch_now().await)
}

/// PUT /visibility
async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Json(update): Json<VisibilityUpdate>,
) -> StatusCode {
    state.visibility.set_hidden(update.hidden);
    tracing::debug!("page hidden: {}", update.hidden);
    StatusCode::NO_CONTENT
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /stats
async fn stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let poller = state.poller.stats();
    Json(serde_json::json!({
        "tokens": state.store.len(),
        "seen_ids": state.store.seen_count(),
        "reconciliations": state.store.reconciliations(),
        "polling": state.poller.is_running(),
        "fetches_issued": poller.issued.load(Ordering::Relaxed),
        "fetches_succeeded": poller.succeeded.load(Ordering::Relaxed),
        "fetches_failed": poller.failed.load(Ordering::Relaxed),
        "fetches_discarded": poller.discarded.load(Ordering::Relaxed),
        "permission": state.gate.permission(),
    }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tokens", get(get_tokens))
        .route("/tokens/:id/scam", post(mark_scam))
        .route("/refresh", post(refresh))
        .route("/visibility", put(set_visibility))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

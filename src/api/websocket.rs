use axum::{
    extract::{State, ws::{WebSocket, WebSocketUpgrade, Message}},
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, Duration};
use futures::{SinkExt, StreamExt};
use crate::services::{PageVisibility, SortSpec};
use super::rest::{current_rows, AppState};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn snapshot_message(state: &AppState) -> String {
    let rows = current_rows(&state.store, SortSpec::default());
    serde_json::json!({
        "type": "snapshot",
        "revision": state.store.reconciliations(),
        "count": rows.len(),
        "data": rows,
    })
    .to_string()
}

/// Applies a client command; returns the reply to send, if any.
fn client_reply(visibility: &PageVisibility, text: &str) -> Option<String> {
    let cmd = serde_json::from_str::<serde_json::Value>(text).ok()?;
    if cmd["type"] == "ping" {
        return Some(r#"{"type":"pong"}"#.to_string());
    }
    if cmd["type"] == "visibility" {
        if let Some(hidden) = cmd["hidden"].as_bool() {
            visibility.set_hidden(hidden);
        }
    }
    None
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut revisions = state.store.subscribe();
    let mut notices = state.notices.subscribe();
    let mut heartbeat = interval(Duration::from_secs(10));

    if sender.send(Message::Text(snapshot_message(&state))).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                if sender.send(Message::Text(snapshot_message(&state))).await.is_err() {
                    break;
                }
            }

            notice = notices.recv() => {
                match notice {
                    Ok(notice) => {
                        let msg = serde_json::json!({
                            "type": "launch_notice",
                            "data": notice,
                        });
                        if sender.send(Message::Text(msg.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("websocket client skipped {} notices", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = client_reply(&state.visibility, &text) {
                            if sender.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }
}

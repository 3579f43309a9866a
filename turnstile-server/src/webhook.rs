//! Webhook ingress.
//!
//! The Bot API pushes updates here as JSON. The handler authenticates the
//! shared-secret header, normalizes the update into an [`InboundEvent`], and
//! hands it to the dispatcher on its own task so the HTTP response is never
//! held hostage by slow downstream work.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::dispatch::{self, EventKind, InboundEvent};
use crate::registry::UserId;
use crate::telegram::FileId;
use crate::AppState;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub from: Option<Sender>,
    pub text: Option<String>,
    /// Thumbnail ladder, smallest first.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Sender,
    pub data: Option<String>,
}

/// Strip Bot API framing down to the event the dispatcher understands.
/// Updates with no actionable payload (joins, edits, stickers) map to `None`.
pub fn event_from_update(update: Update) -> Option<InboundEvent> {
    if let Some(callback) = update.callback_query {
        let data = callback.data?;
        return Some(InboundEvent {
            user: UserId(callback.from.id),
            kind: EventKind::Callback {
                id: callback.id,
                data,
            },
        });
    }

    let message = update.message?;
    let user = UserId(message.from?.id);

    if let Some(text) = message.text {
        return Some(InboundEvent {
            user,
            kind: EventKind::Text(text),
        });
    }
    if let Some(largest) = message.photo.into_iter().last() {
        return Some(InboundEvent {
            user,
            kind: EventKind::Photo(FileId(largest.file_id)),
        });
    }
    None
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn receive_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if presented != state.webhook_secret {
        warn!("Rejected update {} with a bad secret token", update.update_id);
        return StatusCode::UNAUTHORIZED;
    }

    let update_id = update.update_id;
    match event_from_update(update) {
        Some(event) => {
            debug!("Accepted update {} from {}", update_id, event.user);
            let span = info_span!("event", id = %Uuid::new_v4(), user = %event.user);
            tokio::spawn(dispatch::handle_event(state, event).instrument(span));
        }
        None => debug!("Ignoring update {} with no actionable payload", update_id),
    }
    StatusCode::OK
}

//! Event dispatcher.
//!
//! Normalized inbound events enter here. Events for the same user are
//! serialized behind a per-user lock; different users proceed concurrently.
//! Button payloads always route at the top level, free text and media route
//! to the user's active workflow when one exists, otherwise to the idle
//! router. Failures are logged here and never reach the ingress.

mod admin;
mod idle;
mod user;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, warn};

use crate::registry::UserId;
use crate::session::Workflow;
use crate::telegram::{FileId, Markup};
use crate::AppState;

/// One inbound event, stripped of transport framing.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user: UserId,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    Text(String),
    Photo(FileId),
    Callback { id: String, data: String },
}

/// Handle one inbound event to completion.
pub async fn handle_event(state: Arc<AppState>, event: InboundEvent) {
    let user = event.user;
    let lock = state.sessions.user_lock(user).await;
    let _serialized = lock.lock().await;
    if let Err(e) = route(&state, event).await {
        error!("Event handling for {} failed: {:#}", user, e);
    }
}

async fn route(state: &Arc<AppState>, event: InboundEvent) -> Result<()> {
    let user = event.user;
    state.registry.add_user(user).await?;
    let is_admin = state.registry.is_admin(user).await?;

    if let EventKind::Callback { id, data } = &event.kind {
        return idle::handle_callback(state, user, is_admin, id, data).await;
    }

    match state.sessions.get(user).await {
        Some(workflow) => {
            if workflow.admin_only() && !is_admin {
                debug!(
                    "Dropping input from {} into privileged workflow {}",
                    user,
                    workflow.name()
                );
                return Ok(());
            }
            step_workflow(state, user, workflow, event.kind).await
        }
        None => idle::handle_idle(state, user, is_admin, event.kind).await,
    }
}

/// Feed one input into the user's active workflow.
async fn step_workflow(
    state: &Arc<AppState>,
    user: UserId,
    workflow: Workflow,
    kind: EventKind,
) -> Result<()> {
    match (workflow, kind) {
        (Workflow::PostAwaitingImage, EventKind::Photo(photo)) => {
            admin::post_image(state, user, photo).await
        }
        (Workflow::PostAwaitingImage, _) => {
            send(state, user, "Please send the post image.", None).await
        }
        (workflow, EventKind::Text(text)) => {
            let text = text.trim().to_string();
            match workflow {
                Workflow::AwaitingBulkEntry => admin::bulk_entry(state, user, &text).await,
                Workflow::EditAwaitingOldCode => admin::edit_old_code(state, user, &text).await,
                Workflow::EditAwaitingNewCode {
                    old_code,
                    old_title,
                } => admin::edit_new_code(state, user, old_code, old_title, &text).await,
                Workflow::EditAwaitingNewTitle { old_code, new_code } => {
                    admin::edit_new_title(state, user, old_code, new_code, &text).await
                }
                Workflow::DeleteAwaitingCode => admin::delete_code(state, user, &text).await,
                Workflow::StatsAwaitingCode => admin::stats_for_code(state, user, &text).await,
                Workflow::BroadcastAwaitingSpec => {
                    admin::broadcast_spec(state, user, &text).await
                }
                Workflow::AdminAddAwaitingId => admin::admin_add(state, user, &text).await,
                Workflow::ContactAwaitingMessage => {
                    user::contact_message(state, user, &text).await
                }
                Workflow::ReplyAwaitingText { target } => {
                    admin::reply_text(state, user, target, &text).await
                }
                Workflow::SearchAwaitingQuery => user::search_query(state, user, &text).await,
                Workflow::PostAwaitingCaption { photo } => {
                    admin::post_caption(state, user, photo, &text).await
                }
                Workflow::PostAwaitingLink { photo, caption } => {
                    admin::post_link(state, user, photo, caption, &text).await
                }
                // Image input for this state is consumed above.
                Workflow::PostAwaitingImage => Ok(()),
            }
        }
        (workflow, _) => {
            debug!(
                "Non-text input from {} into workflow {}",
                user,
                workflow.name()
            );
            send(state, user, "Please send text.", None).await
        }
    }
}

/// Best-effort outgoing message. Transport failures are logged, not raised:
/// a user we cannot reach must not poison the dispatcher.
pub(crate) async fn send(
    state: &AppState,
    user: UserId,
    text: &str,
    markup: Option<Markup>,
) -> Result<()> {
    if let Err(e) = state.transport.send_text(user, text, markup).await {
        warn!("Failed to message {}: {:#}", user, e);
    }
    Ok(())
}

//! Unprivileged workflow steps: contacting the admins and title search.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::command::{self, CallbackAction};
use crate::registry::UserId;
use crate::telegram::{Button, Markup};
use crate::AppState;

use super::send;

/// Relay one user message to every admin, each copy carrying a reply button
/// addressed back at the sender. Per-admin failures are tolerated; the user
/// only hears a failure when no admin could be reached.
pub(super) async fn contact_message(
    state: &Arc<AppState>,
    user: UserId,
    text: &str,
) -> Result<()> {
    state.sessions.finish(user).await;

    let admins = state.registry.admin_ids().await?;
    let markup = Markup::Inline(vec![vec![Button::callback(
        "Reply",
        CallbackAction::Reply(user).encode(),
    )]]);
    let body = format!("Message from user {}:\n\n{}", user, text);

    let mut relayed = 0usize;
    for admin in admins {
        match state
            .transport
            .send_text(admin, &body, Some(markup.clone()))
            .await
        {
            Ok(()) => relayed += 1,
            Err(e) => warn!("Relay to admin {} failed: {:#}", admin, e),
        }
    }

    if relayed > 0 {
        send(state, user, "Your message was sent to the admins.", None).await
    } else {
        send(
            state,
            user,
            "Could not reach the admins. Please try again later.",
            None,
        )
        .await
    }
}

pub(super) async fn search_query(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    state.sessions.finish(user).await;

    if command::is_cancel(text) {
        return send(state, user, "Search cancelled.", None).await;
    }

    let hits = state.registry.search_titles(text).await?;
    if hits.is_empty() {
        return send(state, user, "Nothing found.", None).await;
    }
    let lines: Vec<String> = hits
        .iter()
        .map(|entry| format!("{} - {}", entry.title, entry.code))
        .collect();
    send(state, user, &lines.join("\n"), None).await
}

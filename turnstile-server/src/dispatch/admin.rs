//! Admin workflow steps: catalog maintenance, stats lookups, broadcasts,
//! admin grants, and replies to relayed user messages.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::broadcast;
use crate::registry::{ChannelId, Code, CodeEntry, RenameOutcome, UserId};
use crate::session::Workflow;
use crate::telegram::{Button, ChatRef, FileId, Markup};
use crate::AppState;

use super::send;

pub(super) async fn summary(state: &Arc<AppState>, user: UserId) -> Result<()> {
    let codes = state.registry.list_codes().await?;
    let users = state.registry.count_users().await?;
    let text = format!("Codes: {}\nUsers: {}", codes.len(), users);
    send(state, user, &text, None).await
}

pub(super) async fn list_codes(state: &Arc<AppState>, user: UserId) -> Result<()> {
    let codes = state.registry.list_codes().await?;
    if codes.is_empty() {
        return send(state, user, "No codes yet.", None).await;
    }
    let lines: Vec<String> = codes
        .iter()
        .map(|entry| format!("{} - {}", entry.code, entry.title))
        .collect();
    send(state, user, &lines.join("\n"), None).await
}

/// One submission closes the bulk workflow; every line is validated and
/// counted independently so one bad record never blocks the rest.
pub(super) async fn bulk_entry(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    state.sessions.finish(user).await;

    let mut added = 0usize;
    let mut failed = 0usize;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match parse_bulk_record(line) {
            Some(entry) => {
                state.registry.upsert_code(entry.clone()).await?;
                info!("Registered code {} ({} parts)", entry.code, entry.part_count);
                if announce(state, &entry).await {
                    added += 1;
                } else {
                    failed += 1;
                }
            }
            None => {
                warn!("Rejected bulk record from {}: {:?}", user, line);
                failed += 1;
            }
        }
    }

    send(
        state,
        user,
        &format!("Added: {}\nFailed: {}", added, failed),
        None,
    )
    .await
}

/// `code channel first_message part_count title...`, whitespace-separated.
fn parse_bulk_record(line: &str) -> Option<CodeEntry> {
    let mut tokens = line.split_whitespace();
    let code = tokens.next()?;
    let channel = tokens.next()?;
    let pointer: i64 = tokens.next()?.parse().ok()?;
    let part_count: u32 = tokens.next()?.parse().ok()?;
    let title = tokens.collect::<Vec<_>>().join(" ");

    if title.is_empty()
        || pointer < 1
        || part_count < 1
        || !code.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    Some(CodeEntry {
        code: Code(code.to_string()),
        channel: ChannelId(channel.to_string()),
        pointer,
        part_count,
        title,
    })
}

/// Publish the first part to every announcement channel with a deep-link
/// button back to us. Returns false if any channel could not be reached.
async fn announce(state: &Arc<AppState>, entry: &CodeEntry) -> bool {
    let markup = Markup::Inline(vec![vec![Button::url(
        "Download",
        state.deep_link(&entry.code),
    )]]);
    let mut all_delivered = true;
    for channel in &state.announcement_channels {
        if let Err(e) = state
            .transport
            .replicate_content(
                &ChatRef::Channel(channel.clone()),
                &entry.channel,
                entry.pointer,
                Some(markup.clone()),
            )
            .await
        {
            warn!("Announcement of {} to {} failed: {:#}", entry.code, channel, e);
            all_delivered = false;
        }
    }
    all_delivered
}

pub(super) async fn edit_old_code(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    let code = Code(text.to_string());
    match state.registry.get_code(&code).await? {
        Some(entry) => {
            state
                .sessions
                .enter(
                    user,
                    Workflow::EditAwaitingNewCode {
                        old_code: entry.code.clone(),
                        old_title: entry.title.clone(),
                    },
                )
                .await;
            send(
                state,
                user,
                &format!("Editing {} ({}). Send the new code.", entry.code, entry.title),
                None,
            )
            .await
        }
        None => send(state, user, "Code not found. Send another code.", None).await,
    }
}

pub(super) async fn edit_new_code(
    state: &Arc<AppState>,
    user: UserId,
    old_code: Code,
    old_title: String,
    text: &str,
) -> Result<()> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return send(state, user, "Codes are numeric. Send the new code.", None).await;
    }
    state
        .sessions
        .enter(
            user,
            Workflow::EditAwaitingNewTitle {
                old_code,
                new_code: Code(text.to_string()),
            },
        )
        .await;
    send(
        state,
        user,
        &format!("Send the new title (currently {:?}).", old_title),
        None,
    )
    .await
}

pub(super) async fn edit_new_title(
    state: &Arc<AppState>,
    user: UserId,
    old_code: Code,
    new_code: Code,
    text: &str,
) -> Result<()> {
    if text.is_empty() {
        return send(state, user, "Send a non-empty title.", None).await;
    }
    state.sessions.finish(user).await;

    let outcome = state.registry.rename_code(&old_code, &new_code, text).await?;
    let reply = match outcome {
        RenameOutcome::Renamed => format!("Updated: {} is now {}.", old_code, new_code),
        RenameOutcome::NotFound => {
            format!("{} no longer exists; nothing was changed.", old_code)
        }
        RenameOutcome::Conflict => {
            format!("{} is already in use; nothing was changed.", new_code)
        }
    };
    send(state, user, &reply, None).await
}

pub(super) async fn delete_code(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return send(state, user, "Codes are numeric. Send the code to delete.", None).await;
    }
    state.sessions.finish(user).await;

    let removed = state.registry.delete_code(&Code(text.to_string())).await?;
    let reply = if removed { "Deleted." } else { "Code not found." };
    send(state, user, reply, None).await
}

pub(super) async fn stats_for_code(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    if text.is_empty() {
        return send(state, user, "Send the code to look up.", None).await;
    }
    state.sessions.finish(user).await;

    let code = Code(text.to_string());
    match state.registry.get_stat(&code).await? {
        Some(stats) => {
            let report = format!(
                "Stats for {}:\nsearched: {}\nviewed: {}",
                code, stats.searched, stats.viewed
            );
            send(state, user, &report, None).await
        }
        None => send(state, user, "Code not found.", None).await,
    }
}

/// Fan-out runs on its own task so the admin's event lock is released while
/// the broadcast grinds through the user list.
pub(super) async fn broadcast_spec(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    let Some((source, pointer)) = broadcast::parse_broadcast_spec(text) else {
        return send(
            state,
            user,
            "Format: source channel and message number, e.g. @channel 42",
            None,
        )
        .await;
    };
    state.sessions.finish(user).await;
    send(state, user, "Broadcast started.", None).await?;

    let state = Arc::clone(state);
    tokio::spawn(async move {
        match broadcast::broadcast(
            &state.registry,
            state.transport.as_ref(),
            &source,
            pointer,
        )
        .await
        {
            Ok(report) => {
                let summary = format!("Broadcast finished. {}", report);
                if let Err(e) = state.transport.send_text(user, &summary, None).await {
                    warn!("Could not report broadcast completion to {}: {:#}", user, e);
                }
            }
            Err(e) => warn!("Broadcast of {} #{} failed: {:#}", source, pointer, e),
        }
    });
    Ok(())
}

pub(super) async fn admin_add(state: &Arc<AppState>, user: UserId, text: &str) -> Result<()> {
    let Ok(id) = text.parse::<i64>() else {
        return send(state, user, "Send a numeric user id.", None).await;
    };
    state.sessions.finish(user).await;

    let target = UserId(id);
    if !state.registry.add_admin(target).await? {
        return send(state, user, "Already an admin.", None).await;
    }
    info!("{} granted admin access to {}", user, target);
    send(state, user, &format!("{} now has admin access.", target), None).await?;

    if let Err(e) = state
        .transport
        .send_text(target, "You have been granted admin access.", None)
        .await
    {
        warn!("Could not notify new admin {}: {:#}", target, e);
        send(state, user, "Could not notify the new admin.", None).await?;
    }
    Ok(())
}

pub(super) async fn reply_text(
    state: &Arc<AppState>,
    user: UserId,
    target: UserId,
    text: &str,
) -> Result<()> {
    state.sessions.finish(user).await;

    let body = format!("Reply from the admins:\n\n{}", text);
    match state.transport.send_text(target, &body, None).await {
        Ok(()) => send(state, user, "Reply sent.", None).await,
        Err(e) => {
            warn!("Reply to {} failed: {:#}", target, e);
            send(state, user, "Could not deliver the reply.", None).await
        }
    }
}

pub(super) async fn post_image(state: &Arc<AppState>, user: UserId, photo: FileId) -> Result<()> {
    state
        .sessions
        .enter(user, Workflow::PostAwaitingCaption { photo })
        .await;
    send(state, user, "Now send the caption.", None).await
}

pub(super) async fn post_caption(
    state: &Arc<AppState>,
    user: UserId,
    photo: FileId,
    text: &str,
) -> Result<()> {
    if text.is_empty() {
        return send(state, user, "Send a non-empty caption.", None).await;
    }
    state
        .sessions
        .enter(
            user,
            Workflow::PostAwaitingLink {
                photo,
                caption: text.to_string(),
            },
        )
        .await;
    send(state, user, "Now send the link the button should open.", None).await
}

pub(super) async fn post_link(
    state: &Arc<AppState>,
    user: UserId,
    photo: FileId,
    caption: String,
    text: &str,
) -> Result<()> {
    if text.is_empty() {
        return send(state, user, "Send the link the button should open.", None).await;
    }
    state.sessions.finish(user).await;

    let markup = Markup::Inline(vec![vec![Button::url("Open", text)]]);
    if let Err(e) = state
        .transport
        .send_image(user, &photo, &caption, Some(markup))
        .await
    {
        warn!("Post preview to {} failed: {:#}", user, e);
        return send(state, user, "Could not publish the post.", None).await;
    }
    Ok(())
}

//! Idle-level router: role menus, deep links, bare redemption codes, and
//! button payloads.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::command::{self, CallbackAction, IdleInput, MenuCommand};
use crate::delivery::{self, PipelineEntry};
use crate::registry::{Code, UserId};
use crate::session::Workflow;
use crate::telegram::Markup;
use crate::AppState;

use super::{send, EventKind};

pub(super) async fn handle_idle(
    state: &Arc<AppState>,
    user: UserId,
    is_admin: bool,
    kind: EventKind,
) -> Result<()> {
    let EventKind::Text(text) = kind else {
        // Unsolicited media at idle has no meaning.
        debug!("Ignoring non-text idle input from {}", user);
        return Ok(());
    };

    match command::classify_idle_text(&text) {
        IdleInput::Start { payload } => start(state, user, is_admin, payload).await,
        IdleInput::Command(cmd) => run_command(state, user, is_admin, cmd).await,
        IdleInput::RedemptionCode(code) => redeem(state, user, &code).await,
        IdleInput::Unrecognized => {
            debug!("Unrecognized idle input from {}: {:?}", user, text);
            Ok(())
        }
    }
}

/// `/start`, optionally carrying a deep-link redemption payload.
async fn start(
    state: &Arc<AppState>,
    user: UserId,
    is_admin: bool,
    payload: Option<String>,
) -> Result<()> {
    if let Some(payload) = payload {
        if !payload.is_empty() && payload.bytes().all(|b| b.is_ascii_digit()) {
            return redeem(state, user, &Code(payload)).await;
        }
        debug!("Ignoring malformed deep-link payload from {}", user);
    }

    if is_admin {
        send(state, user, "Admin panel:", Some(admin_menu())).await
    } else {
        send(
            state,
            user,
            "Welcome! Send a redemption code to receive content.",
            Some(user_menu()),
        )
        .await
    }
}

async fn redeem(state: &Arc<AppState>, user: UserId, code: &Code) -> Result<()> {
    delivery::deliver(
        &state.registry,
        state.transport.as_ref(),
        &state.required_channels,
        user,
        code,
        PipelineEntry::Fresh,
    )
    .await?;
    Ok(())
}

async fn run_command(
    state: &Arc<AppState>,
    user: UserId,
    is_admin: bool,
    cmd: MenuCommand,
) -> Result<()> {
    if cmd.admin_only() && !is_admin {
        debug!("Ignoring privileged command {} from {}", cmd, user);
        return Ok(());
    }

    match cmd {
        MenuCommand::Summary => super::admin::summary(state, user).await,
        MenuCommand::ListCodes => super::admin::list_codes(state, user).await,
        MenuCommand::AddContent => {
            enter(
                state,
                user,
                Workflow::AwaitingBulkEntry,
                "Send one record per line:\ncode channel first_message part_count title",
            )
            .await
        }
        MenuCommand::CodeStats => {
            enter(
                state,
                user,
                Workflow::StatsAwaitingCode,
                "Send the code to look up.",
            )
            .await
        }
        MenuCommand::DeleteCode => {
            enter(
                state,
                user,
                Workflow::DeleteAwaitingCode,
                "Send the code to delete.",
            )
            .await
        }
        MenuCommand::AddAdmin => {
            enter(
                state,
                user,
                Workflow::AdminAddAwaitingId,
                "Send the numeric user id to grant admin access.",
            )
            .await
        }
        MenuCommand::EditCode => {
            enter(
                state,
                user,
                Workflow::EditAwaitingOldCode,
                "Send the code to edit.",
            )
            .await
        }
        MenuCommand::PublishPost => {
            enter(
                state,
                user,
                Workflow::PostAwaitingImage,
                "Send the post image.",
            )
            .await
        }
        MenuCommand::Broadcast => {
            enter(
                state,
                user,
                Workflow::BroadcastAwaitingSpec,
                "Send the broadcast spec: source channel and message number, e.g. @channel 42",
            )
            .await
        }
        MenuCommand::ContactAdmins => {
            enter(
                state,
                user,
                Workflow::ContactAwaitingMessage,
                "Write your message to the admins.",
            )
            .await
        }
        MenuCommand::Search => {
            enter(
                state,
                user,
                Workflow::SearchAwaitingQuery,
                "Send a title to search for. Send 'cancel' to stop.",
            )
            .await
        }
    }
}

async fn enter(
    state: &Arc<AppState>,
    user: UserId,
    workflow: Workflow,
    prompt: &str,
) -> Result<()> {
    state.sessions.enter(user, workflow).await;
    send(state, user, prompt, None).await
}

/// Button payloads route here regardless of any active workflow: a stale
/// keyboard must keep working after its owner moved on.
pub(super) async fn handle_callback(
    state: &Arc<AppState>,
    user: UserId,
    is_admin: bool,
    callback_id: &str,
    data: &str,
) -> Result<()> {
    match CallbackAction::parse(data) {
        Some(CallbackAction::Recheck(code)) => {
            answer(state, callback_id).await;
            delivery::deliver(
                &state.registry,
                state.transport.as_ref(),
                &state.required_channels,
                user,
                &code,
                PipelineEntry::Recheck,
            )
            .await?;
            Ok(())
        }
        Some(CallbackAction::Part(code, part)) => {
            delivery::handle_part_request(
                &state.registry,
                state.transport.as_ref(),
                user,
                &code,
                part,
                callback_id,
            )
            .await
        }
        Some(CallbackAction::Reply(target)) => {
            if !is_admin {
                debug!("Ignoring reply button press from {}", user);
                return Ok(());
            }
            answer(state, callback_id).await;
            state
                .sessions
                .enter(user, Workflow::ReplyAwaitingText { target })
                .await;
            send(
                state,
                user,
                &format!("Write your reply to user {}.", target),
                None,
            )
            .await
        }
        None => {
            warn!("Unparseable callback payload from {}: {:?}", user, data);
            answer(state, callback_id).await;
            Ok(())
        }
    }
}

async fn answer(state: &AppState, callback_id: &str) {
    if let Err(e) = state.transport.answer_callback(callback_id, None).await {
        warn!("Failed to answer callback {}: {:#}", callback_id, e);
    }
}

fn menu_rows(rows: &[&[MenuCommand]]) -> Markup {
    Markup::Menu(
        rows.iter()
            .map(|row| row.iter().map(|cmd| cmd.label().to_string()).collect())
            .collect(),
    )
}

fn admin_menu() -> Markup {
    menu_rows(&[
        &[MenuCommand::AddContent],
        &[MenuCommand::Summary, MenuCommand::CodeStats],
        &[
            MenuCommand::DeleteCode,
            MenuCommand::AddAdmin,
            MenuCommand::ListCodes,
        ],
        &[MenuCommand::EditCode, MenuCommand::PublishPost],
        &[MenuCommand::Broadcast, MenuCommand::Search],
    ])
}

fn user_menu() -> Markup {
    menu_rows(&[&[MenuCommand::ContactAdmins], &[MenuCommand::Search]])
}

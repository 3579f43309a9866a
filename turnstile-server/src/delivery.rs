//! Gated distribution pipeline: resolve a redemption code, run the
//! membership gate, replicate content, and keep the usage counters honest.

use anyhow::Result;
use tracing::{info, warn};

use crate::command::CallbackAction;
use crate::gate::{self, GateOutcome};
use crate::registry::{ChannelId, Code, Registry, StatField, UserId};
use crate::telegram::{Button, ChatRef, Markup, Transport};

/// How a redemption outcome resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    CodeNotFound,
    /// Gate unsatisfied: remediation was presented and the user retries via
    /// the re-check button. Not a failure.
    GateDeferred,
    /// Content replication failed at the transport. Not retried.
    DeliveryFailed,
}

/// Where the pipeline is being entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEntry {
    /// A new redemption attempt. Counts towards `searched`.
    Fresh,
    /// A gate re-check. Re-enters at the gate; `searched` is not
    /// re-incremented.
    Recheck,
}

/// Redeem a code for a user.
///
/// Counter semantics: `searched` is incremented once per fresh entry that
/// reaches the gate-check stage (absent codes touch nothing); `viewed` is
/// incremented exactly once, on the first successful replication.
pub async fn deliver(
    registry: &Registry,
    transport: &dyn Transport,
    required_channels: &[ChannelId],
    user: UserId,
    code: &Code,
    entry: PipelineEntry,
) -> Result<DeliveryOutcome> {
    let Some(bundle) = registry.get_code(code).await? else {
        notify(transport, user, "Code not found.").await;
        return Ok(DeliveryOutcome::CodeNotFound);
    };

    if entry == PipelineEntry::Fresh {
        registry.increment_stat(code, StatField::Init).await?;
        registry.increment_stat(code, StatField::Searched).await?;
    }

    match gate::check_subscribed(transport, user, required_channels).await {
        GateOutcome::NotSatisfied { missing } => {
            info!(
                "Gate unsatisfied for {} redeeming {}: {} channel(s) missing",
                user,
                code,
                missing.len()
            );
            let markup = gate::build_remediation(transport, &missing, code).await;
            if let Err(e) = transport
                .send_text(
                    user,
                    "Join the required channel(s) below, then press the check button.",
                    Some(markup),
                )
                .await
            {
                warn!("Failed to present remediation to {}: {:#}", user, e);
            }
            Ok(DeliveryOutcome::GateDeferred)
        }
        GateOutcome::Satisfied => {
            let selector = part_selector(code, bundle.part_count);
            match transport
                .replicate_content(
                    &ChatRef::User(user),
                    &bundle.channel,
                    bundle.pointer,
                    Some(selector),
                )
                .await
            {
                Ok(()) => {
                    registry.increment_stat(code, StatField::Viewed).await?;
                    info!("Delivered part 1 of {} to {}", code, user);
                    Ok(DeliveryOutcome::Delivered)
                }
                Err(e) => {
                    warn!("Content delivery of {} to {} failed: {:#}", code, user, e);
                    notify(transport, user, "Could not deliver the content. Please try again later.")
                        .await;
                    Ok(DeliveryOutcome::DeliveryFailed)
                }
            }
        }
    }
}

/// Serve one part selected via button press.
///
/// Part `k` (1-indexed) lives at `pointer + (k - 1)`. Out-of-range requests
/// get a non-fatal alert; selector requests never touch the counters.
pub async fn handle_part_request(
    registry: &Registry,
    transport: &dyn Transport,
    user: UserId,
    code: &Code,
    part: u32,
    callback_id: &str,
) -> Result<()> {
    let Some(bundle) = registry.get_code(code).await? else {
        answer(transport, callback_id, Some("Code not found.")).await;
        return Ok(());
    };

    if part < 1 || part > bundle.part_count {
        answer(transport, callback_id, Some("No such part.")).await;
        return Ok(());
    }

    let pointer = bundle.pointer + i64::from(part - 1);
    match transport
        .replicate_content(&ChatRef::User(user), &bundle.channel, pointer, None)
        .await
    {
        Ok(()) => answer(transport, callback_id, None).await,
        Err(e) => {
            warn!(
                "Part {} of {} could not be delivered to {}: {:#}",
                part, code, user, e
            );
            answer(transport, callback_id, Some("Delivery failed. Please try again later.")).await;
        }
    }
    Ok(())
}

/// Selector keyboard addressing every part of a bundle, five buttons per row.
pub fn part_selector(code: &Code, part_count: u32) -> Markup {
    let buttons: Vec<Button> = (1..=part_count)
        .map(|k| Button::callback(k.to_string(), CallbackAction::Part(code.clone(), k).encode()))
        .collect();
    Markup::Inline(buttons.chunks(5).map(<[Button]>::to_vec).collect())
}

/// Best-effort user notice; transport failures are logged, never raised.
async fn notify(transport: &dyn Transport, user: UserId, text: &str) {
    if let Err(e) = transport.send_text(user, text, None).await {
        warn!("Failed to notify {}: {:#}", user, e);
    }
}

async fn answer(transport: &dyn Transport, callback_id: &str, alert: Option<&str>) {
    if let Err(e) = transport.answer_callback(callback_id, alert).await {
        warn!("Failed to answer callback: {:#}", e);
    }
}

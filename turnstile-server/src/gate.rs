//! Membership gate: the subscription precondition in front of content
//! release.
//!
//! Gate checks are stateless per call. Repeated or concurrent checks for the
//! same user are independent; the re-check button simply runs the whole gate
//! again from scratch.

use tracing::warn;

use crate::command::CallbackAction;
use crate::registry::{ChannelId, Code, UserId};
use crate::telegram::{Button, Markup, Transport};

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Satisfied,
    NotSatisfied { missing: Vec<ChannelId> },
}

/// Check whether a user satisfies the subscription requirement for every
/// required channel.
///
/// A transport failure while checking one channel counts that channel as
/// missing (fail closed) and is logged, never raised. Zero required channels
/// is trivially satisfied.
pub async fn check_subscribed(
    transport: &dyn Transport,
    user: UserId,
    required: &[ChannelId],
) -> GateOutcome {
    let mut missing = Vec::new();

    for channel in required {
        match transport.get_membership(channel, user).await {
            Ok(status) if status.is_subscribed() => {}
            Ok(_) => missing.push(channel.clone()),
            Err(e) => {
                warn!(
                    "Membership check for {} in {} failed, counting as unsubscribed: {:#}",
                    user, channel, e
                );
                missing.push(channel.clone());
            }
        }
    }

    if missing.is_empty() {
        GateOutcome::Satisfied
    } else {
        GateOutcome::NotSatisfied { missing }
    }
}

/// Build the remediation keyboard: one invite-link button per missing
/// channel, then a single re-check button parameterized by the code.
///
/// A channel whose invite link cannot be created is logged and skipped; the
/// re-check button still covers it, since re-check re-runs the full gate.
pub async fn build_remediation(
    transport: &dyn Transport,
    missing: &[ChannelId],
    code: &Code,
) -> Markup {
    let mut rows = Vec::with_capacity(missing.len() + 1);

    for channel in missing {
        match transport.create_invite_link(channel).await {
            Ok(url) => rows.push(vec![Button::url("Join channel", url)]),
            Err(e) => warn!("Failed to create invite link for {}: {:#}", channel, e),
        }
    }

    rows.push(vec![Button::callback(
        "I have joined, check again",
        CallbackAction::Recheck(code.clone()).encode(),
    )]);

    Markup::Inline(rows)
}

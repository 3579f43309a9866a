//! Workflow state types.
//!
//! Every multi-turn workflow is an explicit enum variant carrying exactly
//! the data accumulated so far, so each handler's expected fields are
//! statically known. "Idle" is the absence of a slot, not a variant.

use crate::registry::{Code, UserId};
use crate::telegram::FileId;

/// Active workflow state for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    /// Add-content: waiting for newline-delimited bulk records.
    AwaitingBulkEntry,

    /// Edit-code, step 1: waiting for the code to rename.
    EditAwaitingOldCode,
    /// Edit-code, step 2: waiting for the new code.
    EditAwaitingNewCode { old_code: Code, old_title: String },
    /// Edit-code, step 3: waiting for the new title.
    EditAwaitingNewTitle { old_code: Code, new_code: Code },

    /// Delete-code: waiting for the code to remove.
    DeleteAwaitingCode,

    /// Stat-lookup: waiting for the code whose counters to show.
    StatsAwaitingCode,

    /// Broadcast: waiting for the `source_channel pointer` spec.
    BroadcastAwaitingSpec,

    /// Admin-add: waiting for the numeric id of the new admin.
    AdminAddAwaitingId,

    /// Contact-admin: waiting for the message to relay to every admin.
    ContactAwaitingMessage,

    /// Admin-reply: waiting for the reply text to send to `target`.
    ReplyAwaitingText { target: UserId },

    /// Search: waiting for a title query (or the cancel sentinel).
    SearchAwaitingQuery,

    /// Post-authoring, step 1: waiting for the card image.
    PostAwaitingImage,
    /// Post-authoring, step 2: waiting for the caption.
    PostAwaitingCaption { photo: FileId },
    /// Post-authoring, step 3: waiting for the download link.
    PostAwaitingLink { photo: FileId, caption: String },
}

impl Workflow {
    /// Whether input into this state must come from a privileged user.
    /// Non-privileged input into a privileged state is a silent no-op.
    pub fn admin_only(&self) -> bool {
        !matches!(
            self,
            Self::ContactAwaitingMessage | Self::SearchAwaitingQuery
        )
    }

    /// Stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingBulkEntry => "awaiting_bulk_entry",
            Self::EditAwaitingOldCode => "edit_awaiting_old_code",
            Self::EditAwaitingNewCode { .. } => "edit_awaiting_new_code",
            Self::EditAwaitingNewTitle { .. } => "edit_awaiting_new_title",
            Self::DeleteAwaitingCode => "delete_awaiting_code",
            Self::StatsAwaitingCode => "stats_awaiting_code",
            Self::BroadcastAwaitingSpec => "broadcast_awaiting_spec",
            Self::AdminAddAwaitingId => "admin_add_awaiting_id",
            Self::ContactAwaitingMessage => "contact_awaiting_message",
            Self::ReplyAwaitingText { .. } => "reply_awaiting_text",
            Self::SearchAwaitingQuery => "search_awaiting_query",
            Self::PostAwaitingImage => "post_awaiting_image",
            Self::PostAwaitingCaption { .. } => "post_awaiting_caption",
            Self::PostAwaitingLink { .. } => "post_awaiting_link",
        }
    }
}

//! Command vocabulary for the idle-level router.
//!
//! Routing is a lookup over closed enumerations: exact menu strings map to
//! [`MenuCommand`], button payloads map to [`CallbackAction`]. Privilege
//! checks live with the dispatcher, not here.

use std::fmt;

use crate::registry::{Code, UserId};

/// A top-level menu action. Matching is exact-string on the fixed menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    AddContent,
    Summary,
    CodeStats,
    DeleteCode,
    AddAdmin,
    ListCodes,
    EditCode,
    PublishPost,
    Broadcast,
    ContactAdmins,
    Search,
}

/// The fixed menu table. Order here is the display order of the menus.
pub const MENU: &[(&str, MenuCommand)] = &[
    ("Add content", MenuCommand::AddContent),
    ("Summary", MenuCommand::Summary),
    ("Code stats", MenuCommand::CodeStats),
    ("Delete code", MenuCommand::DeleteCode),
    ("Add admin", MenuCommand::AddAdmin),
    ("List codes", MenuCommand::ListCodes),
    ("Edit code", MenuCommand::EditCode),
    ("Publish post", MenuCommand::PublishPost),
    ("Broadcast", MenuCommand::Broadcast),
    ("Contact admins", MenuCommand::ContactAdmins),
    ("Search", MenuCommand::Search),
];

impl MenuCommand {
    pub fn label(&self) -> &'static str {
        MENU.iter()
            .find(|(_, cmd)| cmd == self)
            .map(|(label, _)| *label)
            .expect("every command has a menu entry")
    }

    /// Whether only privileged users may invoke this action. The dispatcher
    /// additionally rejects non-privileged input inside privileged workflows.
    pub fn admin_only(&self) -> bool {
        !matches!(self, Self::ContactAdmins | Self::Search)
    }
}

impl fmt::Display for MenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Exact-string lookup over the menu table.
pub fn parse_menu(text: &str) -> Option<MenuCommand> {
    MENU.iter()
        .find(|(label, _)| *label == text)
        .map(|(_, cmd)| *cmd)
}

/// Classification of free text arriving while the user has no active
/// workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleInput {
    /// `/start`, optionally carrying a deep-link redemption payload.
    Start { payload: Option<String> },
    Command(MenuCommand),
    /// Bare numeric text not matching any command is a redemption lookup.
    RedemptionCode(Code),
    Unrecognized,
}

pub fn classify_idle_text(text: &str) -> IdleInput {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("/start") {
        let payload = rest.trim();
        return IdleInput::Start {
            payload: (!payload.is_empty()).then(|| payload.to_string()),
        };
    }

    if let Some(command) = parse_menu(text) {
        return IdleInput::Command(command);
    }

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return IdleInput::RedemptionCode(Code(text.to_string()));
    }

    IdleInput::Unrecognized
}

/// A decoded button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Re-run the membership gate for a redemption code.
    Recheck(Code),
    /// Request part `k` (1-indexed) of a code's content.
    Part(Code, u32),
    /// Begin an admin reply to the given user.
    Reply(UserId),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            Self::Recheck(code) => format!("recheck:{}", code),
            Self::Part(code, part) => format!("part:{}:{}", code, part),
            Self::Reply(user) => format!("reply:{}", user),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, rest) = data.split_once(':')?;
        match kind {
            "recheck" if !rest.is_empty() => Some(Self::Recheck(Code(rest.to_string()))),
            "part" => {
                let (code, part) = rest.split_once(':')?;
                if code.is_empty() {
                    return None;
                }
                Some(Self::Part(Code(code.to_string()), part.parse().ok()?))
            }
            "reply" => Some(Self::Reply(UserId(rest.parse().ok()?))),
            _ => None,
        }
    }
}

/// Case-insensitive cancel sentinel used by the search workflow.
pub fn is_cancel(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "cancel" | "stop")
}

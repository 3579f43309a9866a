//! Bot API transport client.
//!
//! Everything the core needs from the outside world goes through the
//! [`Transport`] trait: sending messages, replicating channel content,
//! membership lookups, invite links. The production implementation is
//! [`TelegramClient`], a thin typed wrapper over the HTTP Bot API; tests use
//! the recording stub in `test_support`.

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::registry::{ChannelId, UserId};

/// Newtype for a transport-side file reference (e.g. an uploaded photo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId(pub String);

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Opens a URL.
    Url(String),
    /// Sends a callback payload back to us.
    Callback(String),
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Inline buttons under the message, in rows.
    Inline(Vec<Vec<Button>>),
    /// Persistent menu keyboard of plain text buttons.
    Menu(Vec<Vec<String>>),
}

impl Markup {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Markup::Inline(rows) => {
                let rows: Vec<Vec<serde_json::Value>> = rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| match &b.action {
                                ButtonAction::Url(url) => {
                                    json!({ "text": b.label, "url": url })
                                }
                                ButtonAction::Callback(data) => {
                                    json!({ "text": b.label, "callback_data": data })
                                }
                            })
                            .collect()
                    })
                    .collect();
                json!({ "inline_keyboard": rows })
            }
            Markup::Menu(rows) => {
                let rows: Vec<Vec<serde_json::Value>> = rows
                    .iter()
                    .map(|row| row.iter().map(|text| json!({ "text": text })).collect())
                    .collect();
                json!({ "keyboard": rows, "resize_keyboard": true })
            }
        }
    }
}

/// Destination of a replicated message: a private chat or a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    User(UserId),
    Channel(ChannelId),
}

impl ChatRef {
    fn to_json(&self) -> serde_json::Value {
        match self {
            ChatRef::User(id) => json!(id.0),
            ChatRef::Channel(ch) => json!(ch.0),
        }
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::User(id) => write!(f, "{}", id),
            ChatRef::Channel(ch) => write!(f, "{}", ch),
        }
    }
}

/// Membership status of a user in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    /// Status string we don't recognize. Counts as not subscribed.
    Unknown,
}

impl Membership {
    /// Whether this status satisfies the subscription requirement.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Owner | Self::Administrator | Self::Member)
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "creator" => Self::Owner,
            "administrator" => Self::Administrator,
            "member" => Self::Member,
            "restricted" => Self::Restricted,
            "left" => Self::Left,
            "kicked" => Self::Kicked,
            _ => Self::Unknown,
        }
    }
}

/// The transport surface consumed by the core. All calls are fallible remote
/// calls bounded by the client's own timeout.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message to a private chat.
    async fn send_text(&self, user: UserId, text: &str, markup: Option<Markup>) -> Result<()>;

    /// Send a previously uploaded image with a caption.
    async fn send_image(
        &self,
        user: UserId,
        image: &FileId,
        caption: &str,
        markup: Option<Markup>,
    ) -> Result<()>;

    /// Replicate one item from a source channel to a target chat, without the
    /// forwarded-from header.
    async fn replicate_content(
        &self,
        target: &ChatRef,
        source: &ChannelId,
        pointer: i64,
        markup: Option<Markup>,
    ) -> Result<()>;

    /// Forward one item by reference (keeps the forwarded-from header).
    async fn forward_content(&self, target: UserId, source: &ChannelId, pointer: i64)
        -> Result<()>;

    /// Current membership status of a user in a channel.
    async fn get_membership(&self, channel: &ChannelId, user: UserId) -> Result<Membership>;

    /// Create a fresh invite link for a channel.
    async fn create_invite_link(&self, channel: &ChannelId) -> Result<String>;

    /// Acknowledge a button press, optionally with a popup alert.
    async fn answer_callback(&self, callback_id: &str, alert: Option<&str>) -> Result<()>;
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ChatMemberResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct InviteLinkResponse {
    invite_link: String,
}

/// Production transport: typed wrapper over the HTTP Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(format!("https://api.telegram.org/bot{}", token))
    }

    /// Point the client at a different API origin (used by integration
    /// harnesses).
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, base_url }
    }

    /// POST one Bot API method and unwrap the response envelope.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Transport call {} failed to send", method))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Transport call {} returned malformed body", method))?;

        if !envelope.ok {
            return Err(anyhow!(
                "Transport call {} rejected ({}): {}",
                method,
                status,
                envelope.description.unwrap_or_else(|| "no description".to_string())
            ));
        }

        envelope
            .result
            .ok_or_else(|| anyhow!("Transport call {} succeeded without a result", method))
    }

    /// Like `call` but discards the result payload.
    async fn call_unit(&self, method: &str, body: serde_json::Value) -> Result<()> {
        let _: serde_json::Value = self.call(method, body).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_text(&self, user: UserId, text: &str, markup: Option<Markup>) -> Result<()> {
        let mut body = json!({ "chat_id": user.0, "text": text });
        if let Some(markup) = markup {
            body["reply_markup"] = markup.to_json();
        }
        self.call_unit("sendMessage", body).await
    }

    async fn send_image(
        &self,
        user: UserId,
        image: &FileId,
        caption: &str,
        markup: Option<Markup>,
    ) -> Result<()> {
        let mut body = json!({ "chat_id": user.0, "photo": image.0, "caption": caption });
        if let Some(markup) = markup {
            body["reply_markup"] = markup.to_json();
        }
        self.call_unit("sendPhoto", body).await
    }

    async fn replicate_content(
        &self,
        target: &ChatRef,
        source: &ChannelId,
        pointer: i64,
        markup: Option<Markup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": target.to_json(),
            "from_chat_id": source.0,
            "message_id": pointer,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = markup.to_json();
        }
        self.call_unit("copyMessage", body).await
    }

    async fn forward_content(
        &self,
        target: UserId,
        source: &ChannelId,
        pointer: i64,
    ) -> Result<()> {
        let body = json!({
            "chat_id": target.0,
            "from_chat_id": source.0,
            "message_id": pointer,
        });
        self.call_unit("forwardMessage", body).await
    }

    async fn get_membership(&self, channel: &ChannelId, user: UserId) -> Result<Membership> {
        let body = json!({ "chat_id": channel.0, "user_id": user.0 });
        let member: ChatMemberResponse = self.call("getChatMember", body).await?;
        Ok(Membership::parse(&member.status))
    }

    async fn create_invite_link(&self, channel: &ChannelId) -> Result<String> {
        let body = json!({ "chat_id": channel.0 });
        let link: InviteLinkResponse = self.call("createChatInviteLink", body).await?;
        Ok(link.invite_link)
    }

    async fn answer_callback(&self, callback_id: &str, alert: Option<&str>) -> Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = alert {
            body["text"] = json!(text);
            body["show_alert"] = json!(true);
        }
        self.call_unit("answerCallbackQuery", body).await
    }
}

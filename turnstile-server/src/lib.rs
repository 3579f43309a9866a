pub mod broadcast;
pub mod command;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod gate;
pub mod registry;
pub mod session;
pub mod telegram;
pub mod webhook;

#[cfg(test)]
pub mod test_support;

use std::sync::Arc;

use registry::{ChannelId, Code, Registry};
use session::SessionStore;
use telegram::Transport;

/// Shared application state handed to every event handler.
pub struct AppState {
    pub registry: Registry,
    pub transport: Arc<dyn Transport>,
    pub sessions: SessionStore,
    /// Channels a user must be subscribed to before content is released.
    pub required_channels: Vec<ChannelId>,
    /// Channels that receive announcement posts for newly added content.
    pub announcement_channels: Vec<ChannelId>,
    /// Service identity, used to build deep links back to ourselves.
    pub bot_username: String,
    pub webhook_secret: String,
}

impl AppState {
    /// Deep link that redeems `code` when the recipient opens it.
    pub fn deep_link(&self, code: &Code) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, code)
    }
}

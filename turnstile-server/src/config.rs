use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::registry::{ChannelId, UserId};

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub webhook_secret: String,
    /// Bot username without the leading `@`, used for deep links.
    pub bot_username: String,
    /// Channels a user must join before content is released.
    pub required_channels: Vec<ChannelId>,
    /// Channels that receive announcement posts for new content.
    pub announcement_channels: Vec<ChannelId>,
    /// Users granted admin access on startup. Grants made at runtime are
    /// persisted in the registry and survive restarts on their own.
    pub seed_admins: Vec<UserId>,
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("BOT_TOKEN").context("BOT_TOKEN environment variable is required")?;

        let webhook_secret = env::var("WEBHOOK_SECRET")
            .context("WEBHOOK_SECRET environment variable is required")?;

        let bot_username = env::var("BOT_USERNAME")
            .context("BOT_USERNAME environment variable is required")?
            .trim_start_matches('@')
            .to_string();

        let required_channels =
            parse_channel_list(&env::var("REQUIRED_CHANNELS").unwrap_or_default());

        let announcement_channels =
            parse_channel_list(&env::var("ANNOUNCEMENT_CHANNELS").unwrap_or_default());

        let seed_admins = parse_id_list(
            &env::var("ADMIN_IDS").context("ADMIN_IDS environment variable is required")?,
        )
        .context("ADMIN_IDS must be a comma-separated list of numeric user ids")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Config {
            bot_token,
            webhook_secret,
            bot_username,
            required_channels,
            announcement_channels,
            seed_admins,
            port,
            state_dir,
        })
    }
}

/// Comma-separated channel list. Entries are normalized to carry a leading
/// `@`; empty entries are skipped.
pub fn parse_channel_list(value: &str) -> Vec<ChannelId> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if entry.starts_with('@') {
                ChannelId(entry.to_string())
            } else {
                ChannelId(format!("@{}", entry))
            }
        })
        .collect()
}

/// Comma-separated numeric user-id list. Any non-numeric entry fails the
/// whole parse rather than being silently dropped.
pub fn parse_id_list(value: &str) -> Result<Vec<UserId>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<i64>()
                .map(UserId)
                .with_context(|| format!("invalid user id: {:?}", entry))
        })
        .collect()
}

//! Test doubles for the transport seam.
//!
//! `MockTransport` records every outgoing call and lets tests script
//! membership lookups and per-recipient failures, so gate, delivery,
//! broadcast, and dispatch logic can be exercised without HTTP.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::registry::{ChannelId, UserId};
use crate::telegram::{ChatRef, FileId, Markup, Membership, Transport};

/// One recorded outgoing transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum SentItem {
    Text {
        user: UserId,
        text: String,
        markup: Option<Markup>,
    },
    Image {
        user: UserId,
        image: FileId,
        caption: String,
        markup: Option<Markup>,
    },
    Replicated {
        target: ChatRef,
        source: ChannelId,
        pointer: i64,
        markup: Option<Markup>,
    },
    Forwarded {
        target: UserId,
        source: ChannelId,
        pointer: i64,
    },
    CallbackAnswered {
        callback_id: String,
        alert: Option<String>,
    },
}

/// Recording transport stub. Unknown memberships default to `Left`.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentItem>>,
    memberships: Mutex<HashMap<(String, i64), Membership>>,
    /// Users to whom any delivery (text, image, replicate, forward) fails.
    failing_users: Mutex<HashSet<i64>>,
    /// Channels whose membership lookup errors at the transport level.
    failing_channels: Mutex<HashSet<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_membership(&self, channel: &ChannelId, user: UserId, status: Membership) {
        self.memberships
            .lock()
            .unwrap()
            .insert((channel.0.clone(), user.0), status);
    }

    pub fn fail_deliveries_to(&self, user: UserId) {
        self.failing_users.lock().unwrap().insert(user.0);
    }

    pub fn fail_membership_lookup(&self, channel: &ChannelId) {
        self.failing_channels.lock().unwrap().insert(channel.0.clone());
    }

    pub fn sent(&self) -> Vec<SentItem> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to one user, in order.
    pub fn texts_to(&self, user: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|item| match item {
                SentItem::Text { user: u, text, .. } if u == user => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Replications delivered to one user, as (source, pointer, markup).
    pub fn replications_to(&self, user: UserId) -> Vec<(ChannelId, i64, Option<Markup>)> {
        self.sent()
            .into_iter()
            .filter_map(|item| match item {
                SentItem::Replicated {
                    target: ChatRef::User(u),
                    source,
                    pointer,
                    markup,
                } if u == user => Some((source, pointer, markup)),
                _ => None,
            })
            .collect()
    }

    fn check_user(&self, user: UserId) -> Result<()> {
        if self.failing_users.lock().unwrap().contains(&user.0) {
            return Err(anyhow!("scripted transport failure for user {}", user));
        }
        Ok(())
    }

    fn record(&self, item: SentItem) {
        self.sent.lock().unwrap().push(item);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, user: UserId, text: &str, markup: Option<Markup>) -> Result<()> {
        self.check_user(user)?;
        self.record(SentItem::Text {
            user,
            text: text.to_string(),
            markup,
        });
        Ok(())
    }

    async fn send_image(
        &self,
        user: UserId,
        image: &FileId,
        caption: &str,
        markup: Option<Markup>,
    ) -> Result<()> {
        self.check_user(user)?;
        self.record(SentItem::Image {
            user,
            image: image.clone(),
            caption: caption.to_string(),
            markup,
        });
        Ok(())
    }

    async fn replicate_content(
        &self,
        target: &ChatRef,
        source: &ChannelId,
        pointer: i64,
        markup: Option<Markup>,
    ) -> Result<()> {
        if let ChatRef::User(user) = target {
            self.check_user(*user)?;
        }
        self.record(SentItem::Replicated {
            target: target.clone(),
            source: source.clone(),
            pointer,
            markup,
        });
        Ok(())
    }

    async fn forward_content(
        &self,
        target: UserId,
        source: &ChannelId,
        pointer: i64,
    ) -> Result<()> {
        self.check_user(target)?;
        self.record(SentItem::Forwarded {
            target,
            source: source.clone(),
            pointer,
        });
        Ok(())
    }

    async fn get_membership(&self, channel: &ChannelId, user: UserId) -> Result<Membership> {
        if self.failing_channels.lock().unwrap().contains(&channel.0) {
            return Err(anyhow!("scripted lookup failure for channel {}", channel));
        }
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .get(&(channel.0.clone(), user.0))
            .copied()
            .unwrap_or(Membership::Left))
    }

    async fn create_invite_link(&self, channel: &ChannelId) -> Result<String> {
        Ok(format!(
            "https://invite.example/{}",
            channel.0.trim_start_matches('@')
        ))
    }

    async fn answer_callback(&self, callback_id: &str, alert: Option<&str>) -> Result<()> {
        self.record(SentItem::CallbackAnswered {
            callback_id: callback_id.to_string(),
            alert: alert.map(str::to_string),
        });
        Ok(())
    }
}

//! Broadcast fan-out: relay one channel item to every known user.

use std::fmt;

use anyhow::Result;
use tracing::{debug, info};

use crate::registry::{ChannelId, Registry, UserId};
use crate::telegram::Transport;

/// Per-recipient accounting for one fan-out run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delivered: {}, failed: {}", self.delivered, self.failed)
    }
}

/// Forward the referenced item to every known user.
///
/// Failures are isolated per recipient: one user's failure never aborts the
/// remaining iteration. No ordering guarantee, no retry, no pacing.
pub async fn broadcast(
    registry: &Registry,
    transport: &dyn Transport,
    source: &ChannelId,
    pointer: i64,
) -> Result<BroadcastReport> {
    let users = registry.all_user_ids().await?;
    info!(
        "Broadcasting {} #{} to {} user(s)",
        source,
        pointer,
        users.len()
    );

    let mut report = BroadcastReport::default();
    for user in users {
        match transport.forward_content(user, source, pointer).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!("Broadcast to {} failed: {:#}", user, e);
                report.failed += 1;
            }
        }
    }

    info!("Broadcast finished: {}", report);
    Ok(report)
}

/// Parse the two-token broadcast spec: `source_channel pointer`.
pub fn parse_broadcast_spec(text: &str) -> Option<(ChannelId, i64)> {
    let mut tokens = text.split_whitespace();
    let channel = tokens.next()?;
    let pointer: i64 = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((ChannelId(channel.to_string()), pointer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockTransport, SentItem};

    #[tokio::test]
    async fn one_failure_does_not_abort_the_rest() {
        let registry = Registry::open_in_memory().unwrap();
        for id in [1, 2, 3] {
            registry.add_user(UserId(id)).await.unwrap();
        }

        let transport = MockTransport::new();
        transport.fail_deliveries_to(UserId(2));

        let report = broadcast(&registry, &transport, &"@src".into(), 42)
            .await
            .unwrap();
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                failed: 1
            }
        );

        // u3 was still attempted despite u2's failure.
        let forwarded: Vec<UserId> = transport
            .sent()
            .into_iter()
            .filter_map(|item| match item {
                SentItem::Forwarded { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        assert!(forwarded.contains(&UserId(3)));
        assert_eq!(forwarded.len(), 2);
    }

    #[tokio::test]
    async fn broadcast_with_no_users_is_empty_report() {
        let registry = Registry::open_in_memory().unwrap();
        let transport = MockTransport::new();

        let report = broadcast(&registry, &transport, &"@src".into(), 1)
            .await
            .unwrap();
        assert_eq!(report, BroadcastReport::default());
    }

    #[test]
    fn spec_parsing() {
        assert_eq!(
            parse_broadcast_spec("@src 42"),
            Some(("@src".into(), 42))
        );
        assert_eq!(parse_broadcast_spec("@src"), None);
        assert_eq!(parse_broadcast_spec("@src forty-two"), None);
        assert_eq!(parse_broadcast_spec("@src 42 extra"), None);
    }
}

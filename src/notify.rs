//! Notification sink
//!
//! The engine announces phase changes and results through [`Notifier`] and
//! never renders anything itself. The default sink fans announcements out to
//! connected WebSocket clients.

use crate::protocol::{Announcement, ServerMessage};
use crate::types::{ChannelId, NoticeId};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Result type for notification delivery
pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Unknown notice {0}")]
    UnknownNotice(NoticeId),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post an announcement to a channel, returning a handle to it
    async fn announce(
        &self,
        channel_id: &ChannelId,
        announcement: Announcement,
    ) -> NotifyResult<NoticeId>;

    /// Mark the affordances (buttons) of a posted notice inactive
    async fn disable(&self, channel_id: &ChannelId, notice_id: &NoticeId) -> NotifyResult<()>;
}

/// Broadcasts every notice to all subscribers as a [`ServerMessage`]
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ServerMessage>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<ServerMessage>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    fn send(&self, msg: ServerMessage) {
        // No receivers connected is fine
        let _ = self.tx.send(msg);
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn announce(
        &self,
        channel_id: &ChannelId,
        announcement: Announcement,
    ) -> NotifyResult<NoticeId> {
        let notice_id = ulid::Ulid::new().to_string();
        tracing::debug!("Announcing to {}: {:?}", channel_id, announcement);

        self.send(ServerMessage::Announcement {
            channel_id: channel_id.clone(),
            notice_id: notice_id.clone(),
            announcement,
        });
        Ok(notice_id)
    }

    async fn disable(&self, channel_id: &ChannelId, notice_id: &NoticeId) -> NotifyResult<()> {
        self.send(ServerMessage::NoticeDisabled {
            channel_id: channel_id.clone(),
            notice_id: notice_id.clone(),
        });
        Ok(())
    }
}

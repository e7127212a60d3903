use super::actor::{self, SessionHandle};
use super::session::GameSession;
use crate::error::{GameError, GameResult};
use crate::notify::Notifier;
use crate::topics::resolve_topic;
use crate::types::*;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// At most one live session per channel
#[derive(Clone)]
pub struct GameRegistry {
    sessions: Arc<DashMap<ChannelId, SessionHandle>>,
    config: Arc<GameConfig>,
    notifier: Arc<dyn Notifier>,
}

impl GameRegistry {
    pub fn new(config: GameConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            config: Arc::new(config),
            notifier,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create and start a session for `channel_id`
    ///
    /// Check and insert happen under the map's entry lock, so of two
    /// concurrent starts exactly one wins.
    pub fn start_session(
        &self,
        channel_id: ChannelId,
        topic: Option<String>,
    ) -> GameResult<SessionHandle> {
        let topic = resolve_topic(topic)?;

        match self.sessions.entry(channel_id) {
            Entry::Occupied(mut existing) => {
                if !existing.get().is_closed() {
                    return Err(GameError::AlreadyRunning {
                        topic: existing.get().topic().to_string(),
                    });
                }
                // The task behind this entry is gone without releasing it
                tracing::warn!("Replacing dead session in channel {}", existing.key());
                let handle = self.spawn_session(existing.key().clone(), topic);
                existing.insert(handle.clone());
                Ok(handle)
            }
            Entry::Vacant(slot) => {
                let handle = self.spawn_session(slot.key().clone(), topic);
                slot.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    fn spawn_session(&self, channel_id: ChannelId, topic: String) -> SessionHandle {
        let session = GameSession::new(channel_id, topic, &self.config);
        actor::spawn(
            session,
            self.config.clone(),
            self.notifier.clone(),
            self.clone(),
        )
    }

    /// The live session in a channel
    pub fn get(&self, channel_id: &str) -> Option<SessionHandle> {
        self.sessions
            .get(channel_id)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Remove the channel's session and shut it down
    pub fn finish(&self, channel_id: &str) -> Option<SessionHandle> {
        let (_, handle) = self.sessions.remove(channel_id)?;
        handle.shutdown();
        Some(handle)
    }

    /// Drop the entry for a session that ended on its own. A newer session
    /// in the same channel is left alone.
    pub(crate) fn release(&self, channel_id: &str, session_id: &str) {
        self.sessions
            .remove_if(channel_id, |_, handle| handle.session_id() == session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

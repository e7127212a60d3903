mod actor;
mod game;
mod offer;
mod registry;
pub mod session;
pub mod winner;

pub use actor::SessionHandle;
pub use offer::{Generated, OfferBook, OfferReceipt};
pub use registry::GameRegistry;

use crate::artifact::ArtifactProducer;
use crate::notify::{BroadcastNotifier, Notifier};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: GameRegistry,
    pub offers: OfferBook,
    /// Image generator; generation is unavailable without one
    pub producer: Option<Arc<dyn ArtifactProducer>>,
    pub notifier: Arc<dyn Notifier>,
    /// Broadcast channel for sending messages to all connected clients
    pub broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        Self::with_producer(config, None)
    }

    pub fn with_producer(config: GameConfig, producer: Option<Arc<dyn ArtifactProducer>>) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        let notifier = Arc::new(BroadcastNotifier::new(tx.clone()));
        Self::with_notifier(config, producer, notifier, tx)
    }

    /// Use a custom notification sink; `broadcast` still carries
    /// client-facing messages
    pub fn with_notifier(
        config: GameConfig,
        producer: Option<Arc<dyn ArtifactProducer>>,
        notifier: Arc<dyn Notifier>,
        broadcast: broadcast::Sender<ServerMessage>,
    ) -> Self {
        Self {
            registry: GameRegistry::new(config, notifier.clone()),
            offers: OfferBook::default(),
            producer,
            notifier,
            broadcast,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.broadcast.subscribe()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

/// Wall-clock time `after` from now, for display
pub(crate) fn deadline_after(after: Duration) -> String {
    let delta = chrono::Duration::from_std(after).unwrap_or_else(|_| chrono::Duration::zero());
    (chrono::Utc::now() + delta).to_rfc3339()
}

//! Submission offers
//!
//! After a participant generates an image while a game is collecting, the
//! image is offered to the game with submit/leave buttons. Each offer is a
//! collector that only its owner can act on, and only once.

use super::actor::SessionHandle;
use super::{deadline_after, AppState};
use crate::artifact::{filter_models, Artifact, GenerateRequest};
use crate::collector::{self, CollectorHandle, Flow, Rejected};
use crate::error::{GameError, GameResult};
use crate::protocol::Announcement;
use crate::types::*;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A click on an offer
pub(crate) struct OfferAction {
    participant: ParticipantId,
    choice: OfferChoice,
    reply: oneshot::Sender<GameResult<OfferReceipt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferReceipt {
    Submitted { number: usize },
    Left,
}

/// Open offers by id
#[derive(Clone, Default)]
pub struct OfferBook {
    offers: Arc<DashMap<OfferId, CollectorHandle<OfferAction>>>,
}

impl OfferBook {
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn contains(&self, offer_id: &str) -> bool {
        self.offers.contains_key(offer_id)
    }
}

/// Result of a generation request
#[derive(Debug, Clone)]
pub struct Generated {
    pub artifact: Artifact,
    /// Set when the image was offered to a running game
    pub offer_id: Option<OfferId>,
}

impl AppState {
    /// Generate an image and, if the participant can still submit to the
    /// channel's game, offer it to them
    pub async fn generate(
        &self,
        channel_id: &str,
        participant: ParticipantId,
        request: GenerateRequest,
    ) -> GameResult<Generated> {
        let producer = self.producer.as_ref().ok_or_else(|| {
            GameError::GenerationFailed("No image generator configured".to_string())
        })?;

        let artifact = producer.generate(request).await.map_err(|e| {
            tracing::warn!("Generation for {} via {} failed: {}", participant, producer.name(), e);
            GameError::GenerationFailed(e.to_string())
        })?;

        let mut offer_id = None;
        if let Some(session) = self.registry.get(channel_id) {
            if session.can_submit(&participant).await {
                offer_id = Some(self.open_offer(session, participant, artifact.url.clone()).await);
            }
        }

        Ok(Generated { artifact, offer_id })
    }

    async fn open_offer(
        &self,
        session: SessionHandle,
        participant: ParticipantId,
        artifact: ArtifactRef,
    ) -> OfferId {
        let offer_id = ulid::Ulid::new().to_string();
        let window = self.registry.config().offer_duration();
        let channel_id = session.channel_id().clone();

        let notice = match self
            .notifier
            .announce(
                &channel_id,
                Announcement::SubmissionOffer {
                    offer_id: offer_id.clone(),
                    participant: participant.clone(),
                    topic: session.topic().to_string(),
                    artifact: artifact.clone(),
                    deadline: deadline_after(window),
                },
            )
            .await
        {
            Ok(notice_id) => Some(notice_id),
            Err(e) => {
                tracing::error!("Failed to post offer in channel {}: {}", channel_id, e);
                None
            }
        };

        let owner = participant;
        let book = self.offers.clone();
        let notifier = self.notifier.clone();
        let expiring = offer_id.clone();

        let handle = collector::spawn(
            window,
            move |action: &OfferAction| action.participant == owner,
            move |action: OfferAction| {
                let session = session.clone();
                let artifact = artifact.clone();
                async move {
                    let result = match action.choice {
                        OfferChoice::Submit => session
                            .submit(action.participant, artifact)
                            .await
                            .map(|receipt| OfferReceipt::Submitted {
                                number: receipt.number,
                            }),
                        OfferChoice::Leave => session
                            .opt_out(action.participant)
                            .await
                            .map(|()| OfferReceipt::Left),
                    };
                    let _ = action.reply.send(result);
                    Flow::Stop
                }
            },
            move |reason| async move {
                tracing::debug!("Offer {} closed: {:?}", expiring, reason);
                book.offers.remove(&expiring);
                if let Some(notice_id) = notice {
                    if let Err(e) = notifier.disable(&channel_id, &notice_id).await {
                        tracing::warn!("Failed to disable offer {}: {}", expiring, e);
                    }
                }
            },
        );

        self.offers.offers.insert(offer_id.clone(), handle.clone());
        // The end callback may already have run its remove before the insert
        if handle.is_closed() {
            self.offers.offers.remove(&offer_id);
        }
        offer_id
    }

    /// Act on an offer: submit the offered image or leave the game
    pub async fn resolve_offer(
        &self,
        offer_id: &str,
        participant: ParticipantId,
        choice: OfferChoice,
    ) -> GameResult<OfferReceipt> {
        let handle = self
            .offers
            .offers
            .get(offer_id)
            .map(|entry| entry.value().clone())
            .ok_or(GameError::OfferExpired)?;

        let (reply, rx) = oneshot::channel();
        let action = OfferAction {
            participant,
            choice,
            reply,
        };

        match handle.push(action) {
            Ok(()) => rx.await.unwrap_or(Err(GameError::OfferExpired)),
            Err(Rejected::Filtered(_)) => Err(GameError::NotOfferOwner),
            Err(Rejected::Closed(_)) => {
                self.offers.offers.remove(offer_id);
                Err(GameError::OfferExpired)
            }
        }
    }

    /// Model names for autocomplete
    pub async fn list_models(&self, prefix: &str) -> GameResult<Vec<String>> {
        let Some(producer) = self.producer.as_ref() else {
            return Ok(Vec::new());
        };
        let models = producer
            .list_models()
            .await
            .map_err(|e| GameError::GenerationFailed(e.to_string()))?;
        Ok(filter_models(models, prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactProducer, ArtifactResult};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeProducer;

    #[async_trait]
    impl ArtifactProducer for FakeProducer {
        async fn generate(&self, request: GenerateRequest) -> ArtifactResult<Artifact> {
            request.validate()?;
            Ok(Artifact {
                url: format!("https://images.example/{}.png", request.prompt.replace(' ', "_")),
                job_id: None,
            })
        }

        async fn list_models(&self) -> ArtifactResult<Vec<String>> {
            Ok(vec![
                "anything-v4.5.ckpt".to_string(),
                "sdv1_4.ckpt".to_string(),
                "sdv1_5.ckpt".to_string(),
            ])
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn state() -> AppState {
        AppState::with_producer(GameConfig::default(), Some(Arc::new(FakeProducer)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_without_game_has_no_offer() {
        let state = state();
        let generated = state
            .generate("c1", "u1".to_string(), GenerateRequest::new("a robot"))
            .await
            .unwrap();
        assert_eq!(generated.artifact.url, "https://images.example/a_robot.png");
        assert!(generated.offer_id.is_none());
        assert!(state.offers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_without_producer_fails() {
        let state = AppState::new(GameConfig::default());
        let err = state
            .generate("c1", "u1".to_string(), GenerateRequest::new("a robot"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "GENERATION_FAILED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_submit_is_owner_only_and_single_use() {
        let state = state();
        state.start_game("c1".to_string(), Some("Robots".to_string())).unwrap();

        let offer_id = state
            .generate("c1", "u1".to_string(), GenerateRequest::new("a robot"))
            .await
            .unwrap()
            .offer_id
            .expect("offer while collecting");

        assert_eq!(
            state
                .resolve_offer(&offer_id, "u2".to_string(), OfferChoice::Submit)
                .await,
            Err(GameError::NotOfferOwner)
        );

        assert_eq!(
            state
                .resolve_offer(&offer_id, "u1".to_string(), OfferChoice::Submit)
                .await,
            Ok(OfferReceipt::Submitted { number: 1 })
        );

        // Let the offer's end callback run
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!state.offers.contains(&offer_id));
        assert_eq!(
            state
                .resolve_offer(&offer_id, "u1".to_string(), OfferChoice::Submit)
                .await,
            Err(GameError::OfferExpired)
        );

        // Already submitted: no further offers
        let generated = state
            .generate("c1", "u1".to_string(), GenerateRequest::new("another robot"))
            .await
            .unwrap();
        assert!(generated.offer_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_leave_opts_out() {
        let state = state();
        state.start_game("c1".to_string(), None).unwrap();

        let offer_id = state
            .generate("c1", "u1".to_string(), GenerateRequest::new("a robot"))
            .await
            .unwrap()
            .offer_id
            .unwrap();

        assert_eq!(
            state
                .resolve_offer(&offer_id, "u1".to_string(), OfferChoice::Leave)
                .await,
            Ok(OfferReceipt::Left)
        );

        let snapshot = state.game_status("c1").await.unwrap();
        assert_eq!(snapshot.opted_out, 1);
        assert!(snapshot.submissions.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_zero_length_offer_leaves_no_entry() {
        let config = GameConfig {
            offer_seconds: 0,
            ..GameConfig::default()
        };
        let state = AppState::with_producer(config, Some(Arc::new(FakeProducer)));
        state.start_game("c1".to_string(), None).unwrap();

        for i in 0..20 {
            let participant = format!("u{}", i);
            let offer_id = state
                .generate("c1", participant.clone(), GenerateRequest::new("a robot"))
                .await
                .unwrap()
                .offer_id
                .unwrap();
            assert_eq!(
                state
                    .resolve_offer(&offer_id, participant, OfferChoice::Submit)
                    .await,
                Err(GameError::OfferExpired)
            );
        }

        for _ in 0..100 {
            if state.offers.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(state.offers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_expires() {
        let state = state();
        state.start_game("c1".to_string(), None).unwrap();

        let offer_id = state
            .generate("c1", "u1".to_string(), GenerateRequest::new("a robot"))
            .await
            .unwrap()
            .offer_id
            .unwrap();

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(
            state
                .resolve_offer(&offer_id, "u1".to_string(), OfferChoice::Submit)
                .await,
            Err(GameError::OfferExpired)
        );
    }

    #[tokio::test]
    async fn test_list_models_filters_by_prefix() {
        let state = state();
        assert_eq!(
            state.list_models("sdv1").await.unwrap(),
            vec!["sdv1_4.ckpt".to_string(), "sdv1_5.ckpt".to_string()]
        );
        assert!(AppState::new(GameConfig::default())
            .list_models("")
            .await
            .unwrap()
            .is_empty());
    }
}

use super::{AppState, SessionHandle};
use crate::error::{GameError, GameResult};
use crate::types::*;

impl AppState {
    /// Start a game in a channel; a random topic is used when none is given
    pub fn start_game(
        &self,
        channel_id: ChannelId,
        topic: Option<String>,
    ) -> GameResult<SessionHandle> {
        self.registry.start_session(channel_id, topic)
    }

    /// Vote for the submission at `choice` (0-based) in the channel's game
    pub async fn vote(
        &self,
        channel_id: &str,
        participant: ParticipantId,
        choice: usize,
    ) -> GameResult<()> {
        let session = self
            .registry
            .get(channel_id)
            .ok_or(GameError::NoActiveGame)?;
        session.vote(participant, choice).await
    }

    /// Current state of the channel's game, if one is running
    pub async fn game_status(&self, channel_id: &str) -> Option<SessionSnapshot> {
        self.registry.get(channel_id)?.snapshot().await
    }

    /// Stop the channel's game without resolving a winner
    pub fn end_game(&self, channel_id: &str) -> GameResult<()> {
        self.registry
            .finish(channel_id)
            .map(|_| ())
            .ok_or(GameError::NoActiveGame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_start_game_and_status() {
        let state = AppState::default();
        let handle = state
            .start_game("c1".to_string(), Some("Robots".to_string()))
            .unwrap();

        let snapshot = state.game_status("c1").await.unwrap();
        assert_eq!(snapshot.session_id, *handle.session_id());
        assert_eq!(snapshot.topic, "Robots");
        assert_eq!(snapshot.phase, GamePhase::Collecting);
        assert!(state.game_status("c2").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_without_game() {
        let state = AppState::default();
        assert_eq!(
            state.vote("c1", "u1".to_string(), 0).await,
            Err(GameError::NoActiveGame)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_while_collecting_is_rejected() {
        let state = AppState::default();
        let handle = state.start_game("c1".to_string(), None).unwrap();
        handle
            .submit("u1".to_string(), "img1".to_string())
            .await
            .unwrap();

        assert_eq!(
            state.vote("c1", "u2".to_string(), 0).await,
            Err(GameError::VotingNotOpen)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_game_cancels() {
        let state = AppState::default();
        let mut rx = state.subscribe();
        state.start_game("c1".to_string(), None).unwrap();

        assert!(state.end_game("c1").is_ok());
        assert_eq!(state.end_game("c1"), Err(GameError::NoActiveGame));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut cancelled = false;
        while let Ok(msg) = rx.try_recv() {
            if let crate::protocol::ServerMessage::Announcement {
                announcement:
                    crate::protocol::Announcement::Results {
                        outcome: GameOutcome::Cancelled,
                        ..
                    },
                ..
            } = msg
            {
                cancelled = true;
            }
        }
        assert!(cancelled);
    }
}

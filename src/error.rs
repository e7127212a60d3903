//! Engine-level errors
//!
//! Every variant is a rejection that leaves session state untouched. Terminal
//! outcomes such as "not enough submissions" or "no votes" are not errors;
//! see [`crate::types::GameOutcome`].

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("A game is already being run in this channel! Its topic is {topic}.")]
    AlreadyRunning { topic: String },

    #[error("There is no game running in this channel")]
    NoActiveGame,

    #[error("Topics can be at most {max} characters long")]
    TopicTooLong { max: usize },

    #[error("You can no longer submit images for that game")]
    Ineligible,

    #[error("You can't vote twice!")]
    AlreadyVoted,

    #[error("You can't vote for your own image!")]
    SelfVote,

    #[error("That game has already ended")]
    GameEnded,

    #[error("Voting has not started yet")]
    VotingNotOpen,

    #[error("There is no submission #{}", .0.saturating_add(1))]
    UnknownSubmission(usize),

    #[error("Image generation failed: {0}")]
    GenerationFailed(String),

    #[error("That offer has expired")]
    OfferExpired,

    #[error("That offer belongs to someone else")]
    NotOfferOwner,
}

impl GameError {
    /// Stable machine-readable code sent over the wire
    pub fn code(&self) -> &'static str {
        match self {
            GameError::AlreadyRunning { .. } => "ALREADY_RUNNING",
            GameError::NoActiveGame => "NO_ACTIVE_GAME",
            GameError::TopicTooLong { .. } => "TOPIC_TOO_LONG",
            GameError::Ineligible => "INELIGIBLE",
            GameError::AlreadyVoted => "ALREADY_VOTED",
            GameError::SelfVote => "SELF_VOTE",
            GameError::GameEnded => "GAME_ENDED",
            GameError::VotingNotOpen => "VOTING_NOT_OPEN",
            GameError::UnknownSubmission(_) => "UNKNOWN_SUBMISSION",
            GameError::GenerationFailed(_) => "GENERATION_FAILED",
            GameError::OfferExpired => "OFFER_EXPIRED",
            GameError::NotOfferOwner => "NOT_OFFER_OWNER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_mentions_topic() {
        let err = GameError::AlreadyRunning {
            topic: "Robots".to_string(),
        };
        assert_eq!(err.code(), "ALREADY_RUNNING");
        assert!(err.to_string().contains("Robots"));
    }

    #[test]
    fn test_unknown_submission_is_one_based() {
        assert_eq!(
            GameError::UnknownSubmission(2).to_string(),
            "There is no submission #3"
        );
    }

    #[test]
    fn test_unknown_submission_huge_index_does_not_overflow() {
        let msg = GameError::UnknownSubmission(usize::MAX).to_string();
        assert_eq!(msg, format!("There is no submission #{}", usize::MAX));
    }
}

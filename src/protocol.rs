use crate::artifact::GenerateRequest;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a game; a random topic is used when none is given
    StartGame {
        channel_id: ChannelId,
        #[serde(default)]
        topic: Option<String>,
    },
    /// Generate an image; offers it to the game if the participant can submit
    Generate {
        channel_id: ChannelId,
        participant: ParticipantId,
        #[serde(flatten)]
        request: GenerateRequest,
    },
    /// Click on a submit/leave offer
    OfferAction {
        offer_id: OfferId,
        participant: ParticipantId,
        choice: OfferChoice,
    },
    /// Vote for a submission (0-based index)
    Vote {
        channel_id: ChannelId,
        participant: ParticipantId,
        choice: usize,
    },
    GameStatus {
        channel_id: ChannelId,
    },
    /// Stop the channel's game without a result
    EndGame {
        channel_id: ChannelId,
    },
    /// Model names starting with `prefix`, for autocomplete
    ListModels {
        #[serde(default)]
        prefix: String,
    },
}

/// Something posted to a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Announcement {
    CollectionStarted {
        topic: String,
        deadline: String,
        collection_seconds: u64,
        voting_seconds: u64,
    },
    EndingSoon {
        topic: String,
        remaining_seconds: u64,
    },
    /// Submit/leave affordance for a freshly generated image
    SubmissionOffer {
        offer_id: OfferId,
        participant: ParticipantId,
        topic: String,
        artifact: ArtifactRef,
        deadline: String,
    },
    /// Options numbered from 1, each with its own vote affordance
    VotingStarted {
        topic: String,
        options: Vec<Standing>,
        deadline: String,
    },
    Results {
        topic: String,
        outcome: GameOutcome,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    Announcement {
        channel_id: ChannelId,
        notice_id: NoticeId,
        announcement: Announcement,
    },
    /// The affordances of a notice are no longer usable
    NoticeDisabled {
        channel_id: ChannelId,
        notice_id: NoticeId,
    },
    GameStarted {
        channel_id: ChannelId,
        session_id: SessionId,
        topic: String,
    },
    GameStopped {
        channel_id: ChannelId,
    },
    Generated {
        artifact: ArtifactRef,
        offer_id: Option<OfferId>,
    },
    Submitted {
        offer_id: OfferId,
        number: usize,
    },
    LeftGame {
        offer_id: OfferId,
    },
    VoteAck {
        choice: usize,
    },
    Status {
        channel_id: ChannelId,
        session: Option<SessionSnapshot>,
    },
    Models {
        models: Vec<String>,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(err: crate::error::GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

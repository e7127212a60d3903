//! WebSocket message dispatch
//!
//! Every client message maps to one engine operation. Failures are answered
//! with `ServerMessage::Error`; channel-wide announcements go out through the
//! notifier, not as replies.

use crate::artifact::GenerateRequest;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, OfferReceipt};
use crate::types::*;
use std::sync::Arc;

/// Handle client messages and return optional response
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        ClientMessage::StartGame { channel_id, topic } => {
            handle_start_game(state, channel_id, topic).await
        }

        ClientMessage::Generate {
            channel_id,
            participant,
            request,
        } => handle_generate(state, channel_id, participant, request).await,

        ClientMessage::OfferAction {
            offer_id,
            participant,
            choice,
        } => handle_offer_action(state, offer_id, participant, choice).await,

        ClientMessage::Vote {
            channel_id,
            participant,
            choice,
        } => match state.vote(&channel_id, participant, choice).await {
            Ok(()) => Some(ServerMessage::VoteAck { choice }),
            Err(e) => Some(e.into()),
        },

        ClientMessage::GameStatus { channel_id } => {
            let session = state.game_status(&channel_id).await;
            Some(ServerMessage::Status {
                channel_id,
                session,
            })
        }

        ClientMessage::EndGame { channel_id } => match state.end_game(&channel_id) {
            Ok(()) => Some(ServerMessage::GameStopped { channel_id }),
            Err(e) => Some(e.into()),
        },

        ClientMessage::ListModels { prefix } => match state.list_models(&prefix).await {
            Ok(models) => Some(ServerMessage::Models { models }),
            Err(e) => Some(e.into()),
        },
    }
}

async fn handle_start_game(
    state: &Arc<AppState>,
    channel_id: ChannelId,
    topic: Option<String>,
) -> Option<ServerMessage> {
    match state.start_game(channel_id, topic) {
        Ok(session) => Some(ServerMessage::GameStarted {
            channel_id: session.channel_id().clone(),
            session_id: session.session_id().clone(),
            topic: session.topic().to_string(),
        }),
        Err(e) => {
            tracing::debug!("Start game rejected: {}", e);
            Some(e.into())
        }
    }
}

async fn handle_generate(
    state: &Arc<AppState>,
    channel_id: ChannelId,
    participant: ParticipantId,
    request: GenerateRequest,
) -> Option<ServerMessage> {
    tracing::info!("{} requested an image in {}", participant, channel_id);
    match state.generate(&channel_id, participant, request).await {
        Ok(generated) => Some(ServerMessage::Generated {
            artifact: generated.artifact.url,
            offer_id: generated.offer_id,
        }),
        Err(e) => Some(e.into()),
    }
}

async fn handle_offer_action(
    state: &Arc<AppState>,
    offer_id: OfferId,
    participant: ParticipantId,
    choice: OfferChoice,
) -> Option<ServerMessage> {
    match state.resolve_offer(&offer_id, participant, choice).await {
        Ok(OfferReceipt::Submitted { number }) => {
            Some(ServerMessage::Submitted { offer_id, number })
        }
        Ok(OfferReceipt::Left) => Some(ServerMessage::LeftGame { offer_id }),
        Err(e) => Some(e.into()),
    }
}

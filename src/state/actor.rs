//! Session runtime
//!
//! Each live session is owned by one tokio task. Participant actions, timer
//! expiries and the end of the voting window all arrive as messages in the
//! task's mailbox and are applied one at a time, so quota, duplicate and
//! phase checks never race each other.

use super::deadline_after;
use super::registry::GameRegistry;
use super::session::{CollectionClose, GameSession, SubmitReceipt};
use crate::collector::{self, CollectorHandle, Flow, Rejected};
use crate::error::{GameError, GameResult};
use crate::notify::Notifier;
use crate::protocol::Announcement;
use crate::timer::{self, PhaseTimers};
use crate::types::*;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// A vote on its way to the session
pub(crate) struct Ballot {
    participant: ParticipantId,
    choice: usize,
    reply: oneshot::Sender<GameResult<()>>,
}

/// Timer- and window-driven events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseEvent {
    /// Collection ends soon
    Warning,
    /// Collection time is up
    CollectionEnd,
    /// The voting window elapsed
    VotingClosed,
}

pub(crate) enum SessionCommand {
    Submit {
        participant: ParticipantId,
        artifact: ArtifactRef,
        reply: oneshot::Sender<GameResult<SubmitReceipt>>,
    },
    OptOut {
        participant: ParticipantId,
        reply: oneshot::Sender<GameResult<()>>,
    },
    Vote(Ballot),
    CanSubmit {
        participant: ParticipantId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Phase(PhaseEvent),
    Shutdown,
}

/// Cloneable handle to a running session
///
/// All operations go through the session's mailbox. Once the session has
/// ended every operation fails with [`GameError::GameEnded`].
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    channel_id: ChannelId,
    topic: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    ballots: watch::Receiver<Option<CollectorHandle<Ballot>>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("channel_id", &self.channel_id)
            .field("topic", &self.topic)
            .finish()
    }
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// True once the session task has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(make(reply)).ok()?;
        rx.await.ok()
    }

    pub async fn submit(
        &self,
        participant: ParticipantId,
        artifact: ArtifactRef,
    ) -> GameResult<SubmitReceipt> {
        self.request(|reply| SessionCommand::Submit {
            participant,
            artifact,
            reply,
        })
        .await
        .unwrap_or(Err(GameError::GameEnded))
    }

    pub async fn opt_out(&self, participant: ParticipantId) -> GameResult<()> {
        self.request(|reply| SessionCommand::OptOut { participant, reply })
            .await
            .unwrap_or(Err(GameError::GameEnded))
    }

    /// Vote for the submission at `choice` (0-based)
    pub async fn vote(&self, participant: ParticipantId, choice: usize) -> GameResult<()> {
        let (reply, rx) = oneshot::channel();
        let ballot = Ballot {
            participant,
            choice,
            reply,
        };

        let ballot_box = self.ballots.borrow().clone();
        match ballot_box {
            Some(ballot_box) => match ballot_box.push(ballot) {
                Ok(()) => {}
                Err(Rejected::Filtered(_)) => return Err(GameError::UnknownSubmission(choice)),
                Err(Rejected::Closed(_)) => return Err(GameError::GameEnded),
            },
            // Not voting yet; the session answers with the right rejection
            None => {
                if self.commands.send(SessionCommand::Vote(ballot)).is_err() {
                    return Err(GameError::GameEnded);
                }
            }
        }

        rx.await.unwrap_or(Err(GameError::GameEnded))
    }

    pub async fn can_submit(&self, participant: &str) -> bool {
        let participant = participant.to_string();
        self.request(|reply| SessionCommand::CanSubmit { participant, reply })
            .await
            .unwrap_or(false)
    }

    /// Current state, or None if the session already ended
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }
}

/// Start the task owning `session` and arm its collection timers
pub(crate) fn spawn(
    session: GameSession,
    config: Arc<GameConfig>,
    notifier: Arc<dyn Notifier>,
    registry: GameRegistry,
) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (ballots_tx, ballots_rx) = watch::channel(None);

    let handle = SessionHandle {
        session_id: session.id().clone(),
        channel_id: session.channel_id().clone(),
        topic: session.topic().to_string(),
        commands: commands_tx.clone(),
        ballots: ballots_rx,
    };

    let mut timers = PhaseTimers::default();
    if let Some(delay) = config.warning_delay() {
        timers.warning = Some(timer::schedule(
            delay,
            commands_tx.clone(),
            SessionCommand::Phase(PhaseEvent::Warning),
        ));
    }
    timers.end = Some(timer::schedule(
        config.collection_duration(),
        commands_tx.clone(),
        SessionCommand::Phase(PhaseEvent::CollectionEnd),
    ));

    let task = SessionTask {
        session,
        config,
        notifier,
        registry,
        commands: commands_tx,
        timers,
        ballots: ballots_tx,
        ballot_box: None,
    };
    tokio::spawn(task.run(commands_rx));

    handle
}

struct SessionTask {
    session: GameSession,
    config: Arc<GameConfig>,
    notifier: Arc<dyn Notifier>,
    registry: GameRegistry,
    /// For timers and the voting window to post back into the mailbox
    commands: mpsc::UnboundedSender<SessionCommand>,
    timers: PhaseTimers,
    ballots: watch::Sender<Option<CollectorHandle<Ballot>>>,
    ballot_box: Option<CollectorHandle<Ballot>>,
}

impl SessionTask {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        tracing::info!(
            "Game {} started in channel {} with topic {:?}",
            self.session.id(),
            self.session.channel_id(),
            self.session.topic()
        );

        self.announce(Announcement::CollectionStarted {
            topic: self.session.topic().to_string(),
            deadline: deadline_after(self.config.collection_duration()),
            collection_seconds: self.config.collection_seconds,
            voting_seconds: self.config.voting_seconds,
        })
        .await;

        while let Some(command) = commands.recv().await {
            self.handle(command).await;
            if self.session.is_ended() {
                break;
            }
        }

        // Whatever is still queued gets GameEnded through the dropped replies
        commands.close();
        tracing::info!(
            "Game {} in channel {} is over",
            self.session.id(),
            self.session.channel_id()
        );
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit {
                participant,
                artifact,
                reply,
            } => {
                let result = self.session.submit(participant.clone(), artifact);
                match &result {
                    Ok(receipt) => tracing::info!(
                        "{} submitted image #{} in channel {}",
                        participant,
                        receipt.number,
                        self.session.channel_id()
                    ),
                    Err(e) => tracing::debug!("Submission from {} rejected: {}", participant, e),
                }

                let quota_reached = matches!(
                    result,
                    Ok(SubmitReceipt {
                        quota_reached: true,
                        ..
                    })
                );
                let _ = reply.send(result);

                if quota_reached {
                    tracing::info!(
                        "Submission limit reached in channel {}, voting starts early",
                        self.session.channel_id()
                    );
                    self.close_collection().await;
                }
            }

            SessionCommand::OptOut { participant, reply } => {
                let result = self.session.opt_out(participant.clone());
                match &result {
                    Ok(()) => tracing::info!(
                        "{} left the game in channel {}",
                        participant,
                        self.session.channel_id()
                    ),
                    Err(e) => tracing::debug!("Opt-out from {} rejected: {}", participant, e),
                }
                let _ = reply.send(result);
            }

            SessionCommand::Vote(Ballot {
                participant,
                choice,
                reply,
            }) => {
                let result = self.session.vote(participant.clone(), choice);
                match &result {
                    Ok(()) => tracing::debug!("{} voted for #{}", participant, choice + 1),
                    Err(e) => tracing::debug!("Vote from {} rejected: {}", participant, e),
                }
                let _ = reply.send(result);
            }

            SessionCommand::CanSubmit { participant, reply } => {
                let _ = reply.send(self.session.can_submit(&participant));
            }

            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }

            SessionCommand::Phase(event) => self.handle_phase_event(event).await,

            SessionCommand::Shutdown => {
                tracing::info!(
                    "Game {} in channel {} shut down",
                    self.session.id(),
                    self.session.channel_id()
                );
                self.session.cancel();
                self.conclude(GameOutcome::Cancelled).await;
            }
        }
    }

    async fn handle_phase_event(&mut self, event: PhaseEvent) {
        let phase = self.session.phase();
        match (event, phase) {
            (PhaseEvent::Warning, GamePhase::Collecting) => {
                self.timers.warning = None;
                self.announce(Announcement::EndingSoon {
                    topic: self.session.topic().to_string(),
                    remaining_seconds: self.config.warning_seconds,
                })
                .await;
            }
            (PhaseEvent::CollectionEnd, GamePhase::Collecting) => {
                tracing::info!(
                    "Collection time is up in channel {} ({} submissions)",
                    self.session.channel_id(),
                    self.session.submissions().len()
                );
                self.close_collection().await;
            }
            (PhaseEvent::VotingClosed, GamePhase::Voting) => {
                if let Some(outcome) = self.session.finish_voting() {
                    self.conclude(outcome).await;
                }
            }
            // Stale: the phase already moved on
            (event, phase) => {
                tracing::debug!("Ignoring {:?} during {:?}", event, phase);
            }
        }
    }

    async fn close_collection(&mut self) {
        self.timers.cancel_all();

        match self.session.close_collection() {
            Some(CollectionClose::Voting { options }) => self.open_voting(options).await,
            Some(CollectionClose::Insufficient {
                submitted,
                required,
            }) => {
                tracing::info!(
                    "Not enough submissions in channel {} ({} of {})",
                    self.session.channel_id(),
                    submitted,
                    required
                );
                self.conclude(GameOutcome::InsufficientSubmissions {
                    submitted,
                    required,
                })
                .await;
            }
            None => {}
        }
    }

    async fn open_voting(&mut self, options: usize) {
        let window = self.config.voting_duration();
        tracing::info!(
            "Voting opened in channel {} on {} submissions",
            self.session.channel_id(),
            options
        );

        let notice = self
            .announce(Announcement::VotingStarted {
                topic: self.session.topic().to_string(),
                options: self.session.standings(),
                deadline: deadline_after(window),
            })
            .await;

        let forward = self.commands.clone();
        let closing = self.commands.clone();
        let notifier = self.notifier.clone();
        let channel_id = self.session.channel_id().clone();

        let ballot_box = collector::spawn(
            window,
            move |ballot: &Ballot| ballot.choice < options,
            move |ballot: Ballot| {
                let forwarded = forward.send(SessionCommand::Vote(ballot)).is_ok();
                async move {
                    if forwarded {
                        Flow::Continue
                    } else {
                        Flow::Stop
                    }
                }
            },
            move |reason| async move {
                tracing::debug!("Voting window in channel {} ended: {:?}", channel_id, reason);
                if let Some(notice_id) = notice {
                    if let Err(e) = notifier.disable(&channel_id, &notice_id).await {
                        tracing::warn!("Failed to disable vote buttons in {}: {}", channel_id, e);
                    }
                }
                let _ = closing.send(SessionCommand::Phase(PhaseEvent::VotingClosed));
            },
        );

        self.ballots.send_replace(Some(ballot_box.clone()));
        self.ballot_box = Some(ballot_box);
    }

    /// Final step for every way a session can end
    async fn conclude(&mut self, outcome: GameOutcome) {
        self.timers.cancel_all();
        if let Some(ballot_box) = self.ballot_box.take() {
            ballot_box.stop();
        }
        self.ballots.send_replace(None);
        self.registry
            .release(self.session.channel_id(), self.session.id());

        match &outcome {
            GameOutcome::Winners { votes, winners } => tracing::info!(
                "Game in channel {} won by {:?} with {} vote(s)",
                self.session.channel_id(),
                winners.iter().map(|w| w.author.as_str()).collect::<Vec<_>>(),
                votes
            ),
            other => tracing::info!(
                "Game in channel {} ended: {:?}",
                self.session.channel_id(),
                other
            ),
        }

        self.announce(Announcement::Results {
            topic: self.session.topic().to_string(),
            outcome,
        })
        .await;
    }

    async fn announce(&self, announcement: Announcement) -> Option<NoticeId> {
        match self
            .notifier
            .announce(self.session.channel_id(), announcement)
            .await
        {
            Ok(notice_id) => Some(notice_id),
            Err(e) => {
                tracing::error!(
                    "Failed to announce in channel {}: {}",
                    self.session.channel_id(),
                    e
                );
                None
            }
        }
    }
}

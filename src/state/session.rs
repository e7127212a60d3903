use super::winner::{resolve_winners, Resolution};
use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::HashSet;

/// What happened when collection closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionClose {
    /// Enough submissions, voting is open
    Voting { options: usize },
    /// Too few submissions, the session ended without voting
    Insufficient { submitted: usize, required: usize },
}

/// Receipt for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// 1-based position of the submission
    pub number: usize,
    /// This submission filled the last slot; collection must close now
    pub quota_reached: bool,
}

/// State of one game in one channel
///
/// Every method is synchronous and either applies a change completely or
/// rejects it leaving the session untouched. Callers are responsible for
/// serializing access.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    channel_id: ChannelId,
    topic: String,
    opted_out: HashSet<ParticipantId>,
    submissions: Vec<Submission>,
    voting: bool,
    ended: bool,
    max_submissions: usize,
    min_submissions: usize,
}

impl GameSession {
    pub fn new(channel_id: ChannelId, topic: String, config: &GameConfig) -> Self {
        let max_submissions = config
            .max_submissions
            .clamp(MIN_SUBMISSIONS_FLOOR, SUBMISSION_CAP);
        Self {
            id: ulid::Ulid::new().to_string(),
            channel_id,
            topic,
            opted_out: HashSet::new(),
            submissions: Vec::new(),
            voting: false,
            ended: false,
            max_submissions,
            min_submissions: config
                .min_submissions
                .clamp(MIN_SUBMISSIONS_FLOOR, max_submissions),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn phase(&self) -> GamePhase {
        if self.ended {
            GamePhase::Ended
        } else if self.voting {
            GamePhase::Voting
        } else {
            GamePhase::Collecting
        }
    }

    fn has_submitted(&self, participant: &str) -> bool {
        self.submissions.iter().any(|s| s.author == participant)
    }

    fn has_voted(&self, participant: &str) -> bool {
        self.submissions
            .iter()
            .any(|s| s.votes.iter().any(|v| v == participant))
    }

    /// Whether `participant` could submit right now
    pub fn can_submit(&self, participant: &str) -> bool {
        !self.ended
            && !self.voting
            && self.submissions.len() < self.max_submissions
            && !self.opted_out.contains(participant)
            && !self.has_submitted(participant)
    }

    /// Add a submission during collection
    pub fn submit(
        &mut self,
        participant: ParticipantId,
        artifact: ArtifactRef,
    ) -> GameResult<SubmitReceipt> {
        if self.ended {
            return Err(GameError::GameEnded);
        }
        if !self.can_submit(&participant) {
            return Err(GameError::Ineligible);
        }

        self.submissions.push(Submission::new(participant, artifact));
        let number = self.submissions.len();

        Ok(SubmitReceipt {
            number,
            quota_reached: number >= self.max_submissions,
        })
    }

    /// Leave the game without submitting
    pub fn opt_out(&mut self, participant: ParticipantId) -> GameResult<()> {
        if self.ended {
            return Err(GameError::GameEnded);
        }
        if self.voting
            || self.opted_out.contains(&participant)
            || self.has_submitted(&participant)
        {
            return Err(GameError::Ineligible);
        }

        self.opted_out.insert(participant);
        Ok(())
    }

    /// Close collection: open voting, or end right away with too few entries
    ///
    /// Returns None if collection was already closed.
    pub fn close_collection(&mut self) -> Option<CollectionClose> {
        if self.ended || self.voting {
            return None;
        }

        self.voting = true;
        let submitted = self.submissions.len();
        if submitted < self.min_submissions {
            self.ended = true;
            return Some(CollectionClose::Insufficient {
                submitted,
                required: self.min_submissions,
            });
        }

        Some(CollectionClose::Voting { options: submitted })
    }

    /// Record a vote for the submission at `index` (0-based)
    pub fn vote(&mut self, participant: ParticipantId, index: usize) -> GameResult<()> {
        if self.ended {
            return Err(GameError::GameEnded);
        }
        if !self.voting {
            return Err(GameError::VotingNotOpen);
        }
        if index >= self.submissions.len() {
            return Err(GameError::UnknownSubmission(index));
        }
        if self.has_voted(&participant) {
            return Err(GameError::AlreadyVoted);
        }

        let submission = &mut self.submissions[index];
        if submission.author == participant {
            return Err(GameError::SelfVote);
        }

        submission.votes.push(participant);
        Ok(())
    }

    /// Close voting and count the votes
    ///
    /// Returns None unless the session was in the voting phase.
    pub fn finish_voting(&mut self) -> Option<GameOutcome> {
        if self.ended || !self.voting {
            return None;
        }

        self.ended = true;
        let resolution: Resolution = resolve_winners(&self.submissions);
        Some(resolution.into_outcome(&self.submissions))
    }

    /// End the session without resolving it
    pub fn cancel(&mut self) {
        self.voting = true;
        self.ended = true;
    }

    /// Standings in submission order
    pub fn standings(&self) -> Vec<Standing> {
        self.submissions
            .iter()
            .enumerate()
            .map(|(i, s)| Standing {
                number: i + 1,
                author: s.author.clone(),
                artifact: s.artifact.clone(),
                votes: s.vote_count(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            channel_id: self.channel_id.clone(),
            topic: self.topic.clone(),
            phase: self.phase(),
            opted_out: self.opted_out.len(),
            submissions: self.standings(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque ID types for type safety
pub type ChannelId = String;
pub type ParticipantId = String;
pub type SessionId = String;
pub type OfferId = String;
pub type NoticeId = String;
/// URL or handle of a produced image; never inspected by the engine
pub type ArtifactRef = String;

/// Longest topic a session can be started with
pub const MAX_TOPIC_CHARS: usize = 100;

/// Hard cap on submissions per session
pub const SUBMISSION_CAP: usize = 10;

/// Fewest submissions a vote can be held over
pub const MIN_SUBMISSIONS_FLOOR: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Collecting,
    Voting,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub collection_seconds: u64,
    /// How long before the end of collection the warning goes out
    pub warning_seconds: u64,
    pub voting_seconds: u64,
    /// How long a submit/leave offer stays clickable after a generation
    pub offer_seconds: u64,
    pub max_submissions: usize,
    pub min_submissions: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            collection_seconds: 300,
            warning_seconds: 60,
            voting_seconds: 60,
            offer_seconds: 300,
            max_submissions: 10,
            min_submissions: 2,
        }
    }
}

impl GameConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            collection_seconds: env_parse("GAME_COLLECTION_SECONDS")
                .unwrap_or(defaults.collection_seconds),
            warning_seconds: env_parse("GAME_WARNING_SECONDS").unwrap_or(defaults.warning_seconds),
            voting_seconds: env_parse("GAME_VOTING_SECONDS").unwrap_or(defaults.voting_seconds),
            offer_seconds: env_parse("GAME_OFFER_SECONDS").unwrap_or(defaults.offer_seconds),
            max_submissions: env_parse("GAME_MAX_SUBMISSIONS").unwrap_or(defaults.max_submissions),
            min_submissions: env_parse("GAME_MIN_SUBMISSIONS").unwrap_or(defaults.min_submissions),
        };

        if !config.has_valid_limits() {
            tracing::warn!(
                "Submission limits {}..={} outside {}..={}, using defaults",
                config.min_submissions,
                config.max_submissions,
                MIN_SUBMISSIONS_FLOOR,
                SUBMISSION_CAP
            );
            return Self {
                max_submissions: defaults.max_submissions,
                min_submissions: defaults.min_submissions,
                ..config
            };
        }

        config
    }

    /// `MIN_SUBMISSIONS_FLOOR <= min <= max <= SUBMISSION_CAP`
    pub fn has_valid_limits(&self) -> bool {
        (MIN_SUBMISSIONS_FLOOR..=SUBMISSION_CAP).contains(&self.max_submissions)
            && (MIN_SUBMISSIONS_FLOOR..=self.max_submissions).contains(&self.min_submissions)
    }

    pub fn collection_duration(&self) -> Duration {
        Duration::from_secs(self.collection_seconds)
    }

    pub fn voting_duration(&self) -> Duration {
        Duration::from_secs(self.voting_seconds)
    }

    pub fn offer_duration(&self) -> Duration {
        Duration::from_secs(self.offer_seconds)
    }

    /// Delay until the "ending soon" warning, or None when the warning
    /// would land at or before the start of collection
    pub fn warning_delay(&self) -> Option<Duration> {
        if self.warning_seconds == 0 || self.warning_seconds >= self.collection_seconds {
            return None;
        }
        Some(Duration::from_secs(
            self.collection_seconds - self.warning_seconds,
        ))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub author: ParticipantId,
    pub artifact: ArtifactRef,
    /// Voters in arrival order
    pub votes: Vec<ParticipantId>,
}

impl Submission {
    pub fn new(author: ParticipantId, artifact: ArtifactRef) -> Self {
        Self {
            author,
            artifact,
            votes: Vec::new(),
        }
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

/// A submission as shown to voters and in results (numbered from 1)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standing {
    pub number: usize,
    pub author: ParticipantId,
    pub artifact: ArtifactRef,
    pub votes: usize,
}

/// How a session ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameOutcome {
    /// One winner, or several tied on the same nonzero vote count
    Winners { votes: usize, winners: Vec<Standing> },
    NoVotes,
    InsufficientSubmissions { submitted: usize, required: usize },
    /// Shut down from outside before resolving
    Cancelled,
}

impl GameOutcome {
    pub fn is_tie(&self) -> bool {
        matches!(self, GameOutcome::Winners { winners, .. } if winners.len() > 1)
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub channel_id: ChannelId,
    pub topic: String,
    pub phase: GamePhase,
    pub opted_out: usize,
    pub submissions: Vec<Standing>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferChoice {
    Submit,
    Leave,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.collection_duration(), Duration::from_secs(300));
        assert_eq!(config.voting_duration(), Duration::from_secs(60));
        assert_eq!(config.warning_delay(), Some(Duration::from_secs(240)));
        assert_eq!(config.max_submissions, 10);
        assert_eq!(config.min_submissions, 2);
    }

    #[test]
    fn test_warning_skipped_when_lead_too_long() {
        let config = GameConfig {
            collection_seconds: 30,
            warning_seconds: 60,
            ..GameConfig::default()
        };
        assert_eq!(config.warning_delay(), None);

        let config = GameConfig {
            warning_seconds: 0,
            ..GameConfig::default()
        };
        assert_eq!(config.warning_delay(), None);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("GAME_COLLECTION_SECONDS", "120");
        std::env::set_var("GAME_VOTING_SECONDS", " 45 ");
        std::env::set_var("GAME_MAX_SUBMISSIONS", "not-a-number");

        let config = GameConfig::from_env();
        assert_eq!(config.collection_seconds, 120);
        assert_eq!(config.voting_seconds, 45);
        assert_eq!(config.max_submissions, 10);

        std::env::remove_var("GAME_COLLECTION_SECONDS");
        std::env::remove_var("GAME_VOTING_SECONDS");
        std::env::remove_var("GAME_MAX_SUBMISSIONS");
    }

    #[test]
    #[serial]
    fn test_config_from_env_rejects_inverted_limits() {
        std::env::set_var("GAME_MAX_SUBMISSIONS", "3");
        std::env::set_var("GAME_MIN_SUBMISSIONS", "5");

        let config = GameConfig::from_env();
        assert_eq!(config.max_submissions, 10);
        assert_eq!(config.min_submissions, 2);

        std::env::remove_var("GAME_MAX_SUBMISSIONS");
        std::env::remove_var("GAME_MIN_SUBMISSIONS");
    }

    #[test]
    #[serial]
    fn test_config_from_env_rejects_out_of_range_limits() {
        for (max, min) in [("50", "2"), ("10", "1"), ("10", "0"), ("1", "1")] {
            std::env::set_var("GAME_MAX_SUBMISSIONS", max);
            std::env::set_var("GAME_MIN_SUBMISSIONS", min);

            let config = GameConfig::from_env();
            assert_eq!(config.max_submissions, 10, "max={} min={}", max, min);
            assert_eq!(config.min_submissions, 2, "max={} min={}", max, min);
        }

        std::env::set_var("GAME_MAX_SUBMISSIONS", "5");
        std::env::set_var("GAME_MIN_SUBMISSIONS", "3");
        let config = GameConfig::from_env();
        assert_eq!(config.max_submissions, 5);
        assert_eq!(config.min_submissions, 3);

        std::env::remove_var("GAME_MAX_SUBMISSIONS");
        std::env::remove_var("GAME_MIN_SUBMISSIONS");
    }

    #[test]
    fn test_valid_limits() {
        assert!(GameConfig::default().has_valid_limits());
        let too_many = GameConfig {
            max_submissions: 11,
            ..GameConfig::default()
        };
        assert!(!too_many.has_valid_limits());
    }

    #[test]
    fn test_tie_detection() {
        let standing = |number| Standing {
            number,
            author: format!("user{}", number),
            artifact: format!("https://img/{}.png", number),
            votes: 2,
        };
        let tie = GameOutcome::Winners {
            votes: 2,
            winners: vec![standing(1), standing(2)],
        };
        assert!(tie.is_tie());
        assert!(!GameOutcome::NoVotes.is_tie());
    }
}

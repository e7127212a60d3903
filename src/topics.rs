use crate::error::{GameError, GameResult};
use crate::types::MAX_TOPIC_CHARS;
use rand::seq::IndexedRandom;

/// Topics picked from when a game is started without one
pub const GAME_TOPICS: &[&str] = &[
    "Robots",
    "Underwater City",
    "Haunted House",
    "Space Cats",
    "Steampunk Inventions",
    "Enchanted Forest",
    "Dinosaurs in the Modern World",
    "Cyberpunk Street Food",
    "Tiny Worlds",
    "Dragons",
    "Retro Video Games",
    "Floating Islands",
    "Pirate Adventure",
    "Desert Oasis",
    "Winter Village",
    "Mythical Creatures",
    "Abandoned Amusement Park",
    "Alien Marketplace",
    "Candy Land",
    "Time Travelers",
];

/// Pick a random topic from [`GAME_TOPICS`]
pub fn random_topic() -> String {
    GAME_TOPICS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("Robots")
        .to_string()
}

/// The topic a new game will use: the trimmed requested topic, or a random
/// one when none (or only whitespace) was given
pub fn resolve_topic(requested: Option<String>) -> GameResult<String> {
    match requested.map(|t| t.trim().to_string()) {
        Some(topic) if !topic.is_empty() => {
            if topic.chars().count() > MAX_TOPIC_CHARS {
                return Err(GameError::TopicTooLong {
                    max: MAX_TOPIC_CHARS,
                });
            }
            Ok(topic)
        }
        _ => Ok(random_topic()),
    }
}

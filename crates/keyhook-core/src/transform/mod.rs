// Keyhook Transform Module
// Decision pipeline for physical key events

pub mod cache;
pub mod engine;
pub mod generator;
pub mod matcher;
pub mod tagger;

pub use cache::RuleIndex;
pub use engine::{Decision, Engine, RulesetHandle};
pub use generator::{expand_action, EventSequence, Phase};
pub use matcher::{find_rule_match, RuleMatch};
pub use tagger::{EventTagger, SyntheticEvent, DEFAULT_SENTINEL};

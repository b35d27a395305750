// Keyhook Trigger
// The (key, modifier pattern) pair a rule matches against

use std::fmt;

use crate::modifier::modifier_for_key;
use crate::{Key, ModifierPattern, ModifierState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub key: Key,
    pub pattern: ModifierPattern,
}

impl Trigger {
    pub fn new(key: Key, pattern: ModifierPattern) -> Self {
        Self { key, pattern }
    }

    /// Trigger on `key` with no modifiers held
    pub fn bare(key: Key) -> Self {
        Self::new(key, ModifierPattern::exact(ModifierState::empty()))
    }

    /// Pattern actually tested. A modifier key is always held when it fires,
    /// so its own bit is "don't care".
    pub fn effective_pattern(&self) -> ModifierPattern {
        match modifier_for_key(self.key) {
            Some((modifier, _)) => self.pattern.ignoring(modifier),
            None => self.pattern,
        }
    }

    pub fn matches(&self, key: Key, state: ModifierState) -> bool {
        self.key == key && self.effective_pattern().matches(state)
    }

    pub fn specificity(&self) -> u32 {
        self.effective_pattern().specificity()
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pattern = self.pattern.to_string();
        if pattern.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}-{}", pattern, self.key)
        }
    }
}

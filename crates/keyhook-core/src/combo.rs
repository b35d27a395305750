// Keyhook Combo Type
// An output key with the modifiers overlaid while it is sent

use std::fmt;

use crate::{Key, KeyEvent, ModifierState};

/// A key plus the modifier flags carried by its synthetic events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combo {
    pub key: Key,
    pub overlay: ModifierState,
}

impl Combo {
    pub fn new(key: Key, overlay: ModifierState) -> Self {
        Self { key, overlay }
    }

    /// A bare key with no overlay
    pub fn key(key: Key) -> Self {
        Self::new(key, ModifierState::empty())
    }

    pub fn down(&self) -> KeyEvent {
        KeyEvent::down(self.key, self.overlay)
    }

    pub fn up(&self) -> KeyEvent {
        KeyEvent::up(self.key, self.overlay)
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.overlay.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}-{}", self.overlay, self.key)
        }
    }
}

impl From<Key> for Combo {
    fn from(key: Key) -> Self {
        Combo::key(key)
    }
}

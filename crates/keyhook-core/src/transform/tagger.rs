// Keyhook Event Tagger
// Sentinel marking of synthetic events so they are ignored on loopback

use crate::input::UNTAGGED;
use crate::KeyEvent;

/// Default sentinel, ASCII "khook" in the low bytes
pub const DEFAULT_SENTINEL: i64 = 0x6b68_6f6f_6b;

/// A synthetic event ready for injection.
///
/// The caller copies `tag` into the platform event's user-data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticEvent {
    pub event: KeyEvent,
    /// Platform key code of `event.key`
    pub code: u16,
    pub tag: i64,
}

/// Stamps and recognizes the engine's sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTagger {
    sentinel: i64,
}

impl EventTagger {
    /// `sentinel` must differ from `UNTAGGED`; settings validation enforces it
    pub fn new(sentinel: i64) -> Self {
        debug_assert_ne!(sentinel, UNTAGGED);
        Self { sentinel }
    }

    pub fn sentinel(&self) -> i64 {
        self.sentinel
    }

    pub fn tag(&self, event: KeyEvent) -> SyntheticEvent {
        SyntheticEvent {
            event,
            code: event.key.code(),
            tag: self.sentinel,
        }
    }

    /// True if an incoming event carries this engine's sentinel
    pub fn is_own(&self, tag: i64) -> bool {
        tag == self.sentinel
    }
}

impl Default for EventTagger {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL)
    }
}

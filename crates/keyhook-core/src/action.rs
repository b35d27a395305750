// Keyhook Key State
// Down/Up state of a key transition

use std::fmt;

/// State of a key transition.
///
/// Platform hooks report `down` as a bool; `true` is `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Up,
    Down,
}

impl KeyState {
    /// Returns true if this is a DOWN transition
    pub fn is_down(self) -> bool {
        matches!(self, KeyState::Down)
    }

    /// Returns true if this is an UP transition
    pub fn is_up(self) -> bool {
        matches!(self, KeyState::Up)
    }

    pub fn from_bool(down: bool) -> Self {
        if down {
            KeyState::Down
        } else {
            KeyState::Up
        }
    }

    pub fn to_bool(self) -> bool {
        self.is_down()
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Up => write!(f, "up"),
            KeyState::Down => write!(f, "down"),
        }
    }
}

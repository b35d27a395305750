// Keyhook Input Layer - Key Events
// Logical key events and the raw transitions hooks deliver

use std::fmt;

use crate::{Key, KeyState, ModifierState};

/// Tag value of an event that carries no sentinel
pub const UNTAGGED: i64 = 0;

/// A logical key transition, either observed or synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: Key, state: KeyState, mods: ModifierState) -> Self {
        Self {
            key,
            state,
            shift: mods.contains(ModifierState::SHIFT),
            ctrl: mods.contains(ModifierState::CTRL),
            alt: mods.contains(ModifierState::ALT),
            meta: mods.contains(ModifierState::META),
        }
    }

    pub fn down(key: Key, mods: ModifierState) -> Self {
        Self::new(key, KeyState::Down, mods)
    }

    pub fn up(key: Key, mods: ModifierState) -> Self {
        Self::new(key, KeyState::Up, mods)
    }

    /// Modifier flags carried by this event
    pub fn modifiers(&self) -> ModifierState {
        ModifierState::from_flags(self.shift, self.ctrl, self.alt, self.meta)
    }
}

impl fmt::Display for KeyEvent {
    /// e.g. "Shift-Alt-x down"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mods = self.modifiers();
        if mods.is_empty() {
            write!(f, "{} {}", self.key, self.state)
        } else {
            write!(f, "{}-{} {}", mods, self.key, self.state)
        }
    }
}

/// How the hook observed a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Down,
    Up,
    /// Modifier-only change with no explicit direction
    FlagsChanged,
}

impl From<KeyState> for Transition {
    fn from(state: KeyState) -> Self {
        match state {
            KeyState::Down => Transition::Down,
            KeyState::Up => Transition::Up,
        }
    }
}

/// A physical transition as delivered by the OS hook, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Platform virtual key code
    pub code: u16,
    pub transition: Transition,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    /// Value of the platform's event user-data slot
    pub tag: i64,
}

impl RawKeyEvent {
    pub fn new(code: u16, transition: Transition, mods: ModifierState) -> Self {
        Self {
            code,
            transition,
            shift: mods.contains(ModifierState::SHIFT),
            ctrl: mods.contains(ModifierState::CTRL),
            alt: mods.contains(ModifierState::ALT),
            meta: mods.contains(ModifierState::META),
            tag: UNTAGGED,
        }
    }

    pub fn key_down(key: Key, mods: ModifierState) -> Self {
        Self::new(key.code(), Transition::Down, mods)
    }

    pub fn key_up(key: Key, mods: ModifierState) -> Self {
        Self::new(key.code(), Transition::Up, mods)
    }

    /// A flags-changed event for `key` with the flags reported after the change
    pub fn flags_changed(key: Key, reported: ModifierState) -> Self {
        Self::new(key.code(), Transition::FlagsChanged, reported)
    }

    pub fn with_tag(mut self, tag: i64) -> Self {
        self.tag = tag;
        self
    }

    /// Modifier flags reported with the event
    pub fn flags(&self) -> ModifierState {
        ModifierState::from_flags(self.shift, self.ctrl, self.alt, self.meta)
    }
}

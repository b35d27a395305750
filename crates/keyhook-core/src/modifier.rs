// Keyhook Modifier System
// Semantic modifiers (Shift, Ctrl, Alt, Meta), their physical sides and bitsets

use std::fmt;

use strum_macros::{Display, EnumIter, EnumString};

use crate::Key;

/// A semantic modifier, independent of which physical side is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Modifier {
    Shift,
    #[strum(to_string = "Ctrl", serialize = "Control")]
    Ctrl,
    #[strum(to_string = "Alt", serialize = "Option", serialize = "Opt")]
    Alt,
    #[strum(to_string = "Meta", serialize = "Cmd", serialize = "Command", serialize = "Super")]
    Meta,
}

/// Physical side of a modifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Side {
    Left,
    Right,
}

bitflags::bitflags! {
    /// Set of semantic modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierState: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

/// Fixed table: each sided modifier key maps to exactly one modifier and side
const SIDED_MODIFIERS: [(Key, Modifier, Side); 8] = [
    (Key::LeftShift, Modifier::Shift, Side::Left),
    (Key::RightShift, Modifier::Shift, Side::Right),
    (Key::LeftCtrl, Modifier::Ctrl, Side::Left),
    (Key::RightCtrl, Modifier::Ctrl, Side::Right),
    (Key::LeftAlt, Modifier::Alt, Side::Left),
    (Key::RightAlt, Modifier::Alt, Side::Right),
    (Key::LeftMeta, Modifier::Meta, Side::Left),
    (Key::RightMeta, Modifier::Meta, Side::Right),
];

/// Modifier and side of a physical modifier key, `None` for other keys
pub fn modifier_for_key(key: Key) -> Option<(Modifier, Side)> {
    SIDED_MODIFIERS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|&(_, modifier, side)| (modifier, side))
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [Modifier::Shift, Modifier::Ctrl, Modifier::Alt, Modifier::Meta];

    /// Bit for this modifier in a `ModifierState`
    pub fn flag(self) -> ModifierState {
        match self {
            Modifier::Shift => ModifierState::SHIFT,
            Modifier::Ctrl => ModifierState::CTRL,
            Modifier::Alt => ModifierState::ALT,
            Modifier::Meta => ModifierState::META,
        }
    }

    /// Physical key for this modifier on the given side
    pub fn key(self, side: Side) -> Key {
        match (self, side) {
            (Modifier::Shift, Side::Left) => Key::LeftShift,
            (Modifier::Shift, Side::Right) => Key::RightShift,
            (Modifier::Ctrl, Side::Left) => Key::LeftCtrl,
            (Modifier::Ctrl, Side::Right) => Key::RightCtrl,
            (Modifier::Alt, Side::Left) => Key::LeftAlt,
            (Modifier::Alt, Side::Right) => Key::RightAlt,
            (Modifier::Meta, Side::Left) => Key::LeftMeta,
            (Modifier::Meta, Side::Right) => Key::RightMeta,
        }
    }

    /// Parse a modifier alias ("Ctrl", "cmd", "Option"...)
    pub fn from_alias(alias: &str) -> Result<Modifier, ModifierError> {
        alias
            .parse()
            .map_err(|_| ModifierError::UnknownAlias(alias.to_string()))
    }
}

impl ModifierState {
    /// Build a state from four booleans, the shape platform hooks report
    pub fn from_flags(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Self {
        let mut state = ModifierState::empty();
        state.set(ModifierState::SHIFT, shift);
        state.set(ModifierState::CTRL, ctrl);
        state.set(ModifierState::ALT, alt);
        state.set(ModifierState::META, meta);
        state
    }

    /// Modifiers in canonical order
    pub fn modifiers(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(m.flag()))
    }
}

impl fmt::Display for ModifierState {
    /// Hyphen-joined names, e.g. "Shift-Alt"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for modifier in self.modifiers() {
            if !first {
                write!(f, "-")?;
            }
            write!(f, "{}", modifier)?;
            first = false;
        }
        Ok(())
    }
}

/// Modifier requirement of a trigger.
///
/// Bits in `required` must be held, bits in `forbidden` must not be held,
/// anything else is "don't care".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierPattern {
    pub required: ModifierState,
    pub forbidden: ModifierState,
}

impl ModifierPattern {
    /// Exactly these modifiers and no others
    pub fn exact(mods: ModifierState) -> Self {
        Self {
            required: mods,
            forbidden: ModifierState::all().difference(mods),
        }
    }

    /// Matches any modifier state
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, state: ModifierState) -> bool {
        state.contains(self.required) && !state.intersects(self.forbidden)
    }

    /// Number of pinned modifier bits, 0 to 4
    pub fn specificity(&self) -> u32 {
        self.required.union(self.forbidden).bits().count_ones()
    }

    /// Pattern with `modifier` moved to "don't care"
    pub fn ignoring(mut self, modifier: Modifier) -> Self {
        self.required.remove(modifier.flag());
        self.forbidden.remove(modifier.flag());
        self
    }
}

impl fmt::Display for ModifierPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        for modifier in Modifier::ALL {
            if self.required.contains(modifier.flag()) {
                parts.push(modifier.to_string());
            } else if !self.forbidden.contains(modifier.flag()) {
                parts.push(format!("?{}", modifier));
            }
        }
        write!(f, "{}", parts.join("-"))
    }
}

/// Errors related to modifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierError {
    /// Alias not recognized
    UnknownAlias(String),
}

impl fmt::Display for ModifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierError::UnknownAlias(alias) => write!(f, "unknown modifier alias: '{}'", alias),
        }
    }
}

impl std::error::Error for ModifierError {}

// Keyhook Config API - Combo String Parser
// Parses combo strings like "Shift-Alt-x" and trigger strings like "Ctrl-?Shift-k"

use crate::{Combo, Key, Modifier, ModifierPattern, ModifierState, Trigger};

/// Errors that can occur during combo parsing
#[derive(Debug, Clone, PartialEq)]
pub enum ComboParseError {
    /// Empty input string
    EmptyInput,
    /// Key name not recognized
    UnknownKey(String),
    /// Modifier alias not recognized
    UnknownModifier(String),
    /// Input ends with hyphen (e.g., "Ctrl-")
    TrailingHyphen,
    /// Same modifier both required and optional (e.g., "Shift-?Shift-k")
    ConflictingModifier(Modifier),
    /// Pattern markers ("?Shift", "*") used in an output combo
    PatternInCombo(String),
}

impl std::fmt::Display for ComboParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComboParseError::EmptyInput => write!(f, "combo string cannot be empty"),
            ComboParseError::UnknownKey(name) => write!(f, "unknown key name: '{}'", name),
            ComboParseError::UnknownModifier(name) => write!(f, "unknown modifier: '{}'", name),
            ComboParseError::TrailingHyphen => write!(f, "combo string cannot end with hyphen"),
            ComboParseError::ConflictingModifier(m) => {
                write!(f, "modifier {} is both required and optional", m)
            }
            ComboParseError::PatternInCombo(part) => {
                write!(f, "'{}' is only allowed in triggers", part)
            }
        }
    }
}

impl std::error::Error for ComboParseError {}

/// Split into modifier parts and the key part
fn split_parts(exp: &str) -> Result<(Vec<&str>, Key), ComboParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Err(ComboParseError::EmptyInput);
    }
    if trimmed.ends_with('-') {
        return Err(ComboParseError::TrailingHyphen);
    }

    let mut parts: Vec<&str> = trimmed.split('-').map(str::trim).collect();
    // The last part is always the key
    let key_str = parts.pop().ok_or(ComboParseError::EmptyInput)?;
    let key = Key::from_name(key_str).ok_or_else(|| ComboParseError::UnknownKey(key_str.to_string()))?;
    Ok((parts, key))
}

fn parse_modifier(part: &str) -> Result<Modifier, ComboParseError> {
    Modifier::from_alias(part).map_err(|_| ComboParseError::UnknownModifier(part.to_string()))
}

/// Parse an output combo like "Shift-Alt-x".
///
/// Duplicate modifiers collapse into one.
///
/// # Examples
/// ```
/// use keyhook_core::config::parse_combo_string;
/// use keyhook_core::{Key, ModifierState};
/// let combo = parse_combo_string("Ctrl-a").unwrap();
/// assert_eq!(combo.key, Key::A);
/// assert_eq!(combo.overlay, ModifierState::CTRL);
/// ```
pub fn parse_combo_string(exp: &str) -> Result<Combo, ComboParseError> {
    let (parts, key) = split_parts(exp)?;
    let mut overlay = ModifierState::empty();
    for part in parts {
        if part == "*" || part.starts_with('?') {
            return Err(ComboParseError::PatternInCombo(part.to_string()));
        }
        overlay.insert(parse_modifier(part)?.flag());
    }
    Ok(Combo::new(key, overlay))
}

/// Parse a trigger like "Ctrl-k", "Ctrl-?Shift-k" or "*-capsLock".
///
/// Listed modifiers are required and unlisted ones forbidden. `?Mod` marks a
/// modifier as "don't care"; `*` marks every unlisted modifier as "don't care".
pub fn parse_trigger_string(exp: &str) -> Result<Trigger, ComboParseError> {
    let (parts, key) = split_parts(exp)?;
    let mut required = ModifierState::empty();
    let mut optional = ModifierState::empty();
    let mut wildcard = false;

    for part in parts {
        if part == "*" {
            wildcard = true;
        } else if let Some(name) = part.strip_prefix('?') {
            optional.insert(parse_modifier(name)?.flag());
        } else {
            required.insert(parse_modifier(part)?.flag());
        }
    }

    if let Some(conflict) = required.intersection(optional).modifiers().next() {
        return Err(ComboParseError::ConflictingModifier(conflict));
    }

    let forbidden = if wildcard {
        ModifierState::empty()
    } else {
        ModifierState::all().difference(required).difference(optional)
    };
    Ok(Trigger::new(key, ModifierPattern { required, forbidden }))
}

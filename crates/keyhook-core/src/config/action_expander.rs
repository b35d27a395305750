// Keyhook Config API - Action Expander
// Turns action strings and step lists into SyntheticAction values

use indexmap::IndexMap;
use serde::Deserialize;

use super::combo_parser::{parse_combo_string, ComboParseError};
use crate::mapping::{ActionStep, SyntheticAction};
use crate::Key;

/// Upper bound for "N*key" repeat counts
pub const MAX_REPEAT: u32 = 100;

/// Action as written in TOML: one string or a list of step strings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ActionToml {
    Single(String),
    Steps(Vec<String>),
}

/// Errors raised while expanding one action
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpandError {
    #[error("invalid combo '{input}': {source}")]
    Combo {
        input: String,
        #[source]
        source: ComboParseError,
    },

    #[error("unknown named action '@{0}'")]
    UnknownAction(String),

    #[error("invalid repeat '{0}' (expected N*key with 1 <= N <= 100)")]
    InvalidRepeat(String),

    #[error("character {0:?} cannot be typed")]
    UntypeableChar(char),

    #[error("action has no steps")]
    Empty,

    #[error("hold needs a single combo action")]
    HoldNeedsCombo,
}

/// Named actions resolved so far, in declaration order
pub type NamedActions = IndexMap<String, SyntheticAction>;

fn combo(input: &str) -> Result<crate::Combo, ExpandError> {
    parse_combo_string(input).map_err(|source| ExpandError::Combo {
        input: input.to_string(),
        source,
    })
}

fn lookup<'a>(name: &str, named: &'a NamedActions) -> Result<&'a SyntheticAction, ExpandError> {
    named
        .get(name)
        .ok_or_else(|| ExpandError::UnknownAction(name.to_string()))
}

/// Steps equivalent to running `action` once inside a sequence
fn inline_steps(action: &SyntheticAction) -> Vec<ActionStep> {
    match action {
        SyntheticAction::PressRelease(c) | SyntheticAction::HoldOverlay(c) => vec![ActionStep::Tap(*c)],
        SyntheticAction::Sequence(steps) => steps.clone(),
    }
}

/// Parse one step string into one or more steps.
///
/// Forms: `key`, `Mod-key`, `press X`, `release X`, `N*X`, `"text"`, `@name`.
pub fn parse_step(input: &str, named: &NamedActions) -> Result<Vec<ActionStep>, ExpandError> {
    let step = input.trim();
    if step.is_empty() {
        return Err(ExpandError::Empty);
    }

    if let Some(name) = step.strip_prefix('@') {
        return Ok(inline_steps(lookup(name.trim(), named)?));
    }

    if step.len() >= 2 && step.starts_with('"') && step.ends_with('"') {
        let text = &step[1..step.len() - 1];
        if let Some(bad) = text.chars().find(|c| Key::for_char(*c).is_none()) {
            return Err(ExpandError::UntypeableChar(bad));
        }
        return Ok(vec![ActionStep::Text(text.to_string())]);
    }

    if let Some(rest) = step.strip_prefix("press ") {
        return Ok(vec![ActionStep::Press(combo(rest.trim())?)]);
    }
    if let Some(rest) = step.strip_prefix("release ") {
        return Ok(vec![ActionStep::Release(combo(rest.trim())?)]);
    }

    if let Some((count, rest)) = step.split_once('*') {
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| ExpandError::InvalidRepeat(step.to_string()))?;
        if count == 0 || count > MAX_REPEAT {
            return Err(ExpandError::InvalidRepeat(step.to_string()));
        }
        let tap = ActionStep::Tap(combo(rest.trim())?);
        return Ok(vec![tap; count as usize]);
    }

    Ok(vec![ActionStep::Tap(combo(step)?)])
}

/// Expand a TOML action into a `SyntheticAction`.
///
/// A single combo string becomes `PressRelease`, or `HoldOverlay` when
/// `hold` is set. Any other form becomes a `Sequence`.
pub fn expand_action(action: &ActionToml, hold: bool, named: &NamedActions) -> Result<SyntheticAction, ExpandError> {
    match action {
        ActionToml::Single(input) => {
            let input = input.trim();
            if let Some(name) = input.strip_prefix('@') {
                let resolved = lookup(name.trim(), named)?;
                return match (resolved, hold) {
                    (SyntheticAction::PressRelease(c) | SyntheticAction::HoldOverlay(c), true) => {
                        Ok(SyntheticAction::HoldOverlay(*c))
                    }
                    (SyntheticAction::Sequence(_), true) => Err(ExpandError::HoldNeedsCombo),
                    (other, false) => Ok(other.clone()),
                };
            }
            if let Ok(c) = parse_combo_string(input) {
                return Ok(if hold {
                    SyntheticAction::HoldOverlay(c)
                } else {
                    SyntheticAction::PressRelease(c)
                });
            }
            if hold {
                return Err(ExpandError::HoldNeedsCombo);
            }
            Ok(SyntheticAction::Sequence(parse_step(input, named)?))
        }
        ActionToml::Steps(list) => {
            if hold {
                return Err(ExpandError::HoldNeedsCombo);
            }
            let mut steps = Vec::new();
            for item in list {
                steps.extend(parse_step(item, named)?);
            }
            if steps.is_empty() {
                return Err(ExpandError::Empty);
            }
            Ok(SyntheticAction::Sequence(steps))
        }
    }
}

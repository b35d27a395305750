// Keyhook Synthetic Event Generator
// Expands rule actions into ordered synthetic key events

use smallvec::SmallVec;

use crate::mapping::{ActionStep, SyntheticAction};
use crate::{Combo, Key, KeyEvent, ModifierState};

/// Which half of the physical key press is being expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Press,
    Release,
}

pub type EventSequence = SmallVec<[KeyEvent; 4]>;

/// Ordered synthetic events for `action` at `phase`.
///
/// Pure: never reads or writes modifier state. Overlay modifiers travel on
/// each event's own flags.
pub fn expand_action(action: &SyntheticAction, phase: Phase) -> EventSequence {
    let mut events = EventSequence::new();
    match (action, phase) {
        (SyntheticAction::PressRelease(combo), Phase::Press) => {
            events.push(combo.down());
            events.push(combo.up());
        }
        (SyntheticAction::PressRelease(_), Phase::Release) => {}
        (SyntheticAction::HoldOverlay(combo), Phase::Press) => events.push(combo.down()),
        (SyntheticAction::HoldOverlay(combo), Phase::Release) => events.push(combo.up()),
        (SyntheticAction::Sequence(steps), Phase::Press) => {
            for step in steps {
                expand_step(step, &mut events);
            }
        }
        (SyntheticAction::Sequence(_), Phase::Release) => {}
    }
    events
}

fn expand_step(step: &ActionStep, events: &mut EventSequence) {
    match step {
        ActionStep::Press(combo) => events.push(combo.down()),
        ActionStep::Release(combo) => events.push(combo.up()),
        ActionStep::Tap(combo) => {
            events.push(combo.down());
            events.push(combo.up());
        }
        ActionStep::Text(text) => {
            for c in text.chars() {
                let Some((key, shifted)) = Key::for_char(c) else {
                    continue;
                };
                let overlay = if shifted { ModifierState::SHIFT } else { ModifierState::empty() };
                let combo = Combo::new(key, overlay);
                events.push(combo.down());
                events.push(combo.up());
            }
        }
    }
}

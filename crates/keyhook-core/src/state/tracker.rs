// Keyhook Modifier Tracker
// Live modifier bitset derived from physical transitions

use crate::modifier::{modifier_for_key, Modifier, Side};
use crate::{Key, KeyEvent, KeyState, ModifierState};

bitflags::bitflags! {
    /// Held modifier keys, one bit per physical side
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct HeldSides: u8 {
        const LEFT_SHIFT = 1 << 0;
        const RIGHT_SHIFT = 1 << 1;
        const LEFT_CTRL = 1 << 2;
        const RIGHT_CTRL = 1 << 3;
        const LEFT_ALT = 1 << 4;
        const RIGHT_ALT = 1 << 5;
        const LEFT_META = 1 << 6;
        const RIGHT_META = 1 << 7;
    }
}

impl HeldSides {
    fn bit(modifier: Modifier, side: Side) -> Self {
        let index = match modifier {
            Modifier::Shift => 0,
            Modifier::Ctrl => 2,
            Modifier::Alt => 4,
            Modifier::Meta => 6,
        } + match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        HeldSides::from_bits_truncate(1 << index)
    }

    fn either(modifier: Modifier) -> Self {
        Self::bit(modifier, Side::Left) | Self::bit(modifier, Side::Right)
    }
}

/// Tracks which modifier keys are physically held.
///
/// Left and right keys are tracked independently; a semantic modifier is
/// held while either side is. Only physical transitions may be applied:
/// synthetic events never reach the tracker.
#[derive(Debug, Clone, Default)]
pub struct ModifierTracker {
    held: HeldSides,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a physical transition. Non-modifier keys leave the state unchanged.
    pub fn apply(&mut self, event: &KeyEvent) {
        let Some((modifier, side)) = modifier_for_key(event.key) else {
            return;
        };
        let bit = HeldSides::bit(modifier, side);
        match event.state {
            KeyState::Down => self.held.insert(bit),
            KeyState::Up => self.held.remove(bit),
        }
    }

    /// Infer the direction of a flags-changed transition for `key`.
    ///
    /// `reported` is the modifier flags the platform reports after the
    /// change. A clear bit means the key went up. A set bit is ambiguous when
    /// the other side of the same modifier is held, so it is resolved from
    /// this side's stored state: if this side was already down, the event is
    /// its release. Returns `None` for keys outside the sided modifier table.
    pub fn classify_flags_changed(&self, key: Key, reported: ModifierState) -> Option<KeyState> {
        let (modifier, side) = modifier_for_key(key)?;
        if !reported.contains(modifier.flag()) {
            return Some(KeyState::Up);
        }
        if self.is_held(modifier, side) {
            Some(KeyState::Up)
        } else {
            Some(KeyState::Down)
        }
    }

    /// Current semantic modifier bitset
    pub fn state(&self) -> ModifierState {
        let mut state = ModifierState::empty();
        for modifier in Modifier::ALL {
            if self.held.intersects(HeldSides::either(modifier)) {
                state.insert(modifier.flag());
            }
        }
        state
    }

    pub fn is_held(&self, modifier: Modifier, side: Side) -> bool {
        self.held.contains(HeldSides::bit(modifier, side))
    }

    /// Physical modifier keys currently held
    pub fn held_keys(&self) -> impl Iterator<Item = Key> + '_ {
        Modifier::ALL.into_iter().flat_map(move |modifier| {
            [Side::Left, Side::Right]
                .into_iter()
                .filter(move |&side| self.is_held(modifier, side))
                .map(move |side| modifier.key(side))
        })
    }

    /// Forget every held modifier
    pub fn reset(&mut self) {
        self.held = HeldSides::empty();
    }
}

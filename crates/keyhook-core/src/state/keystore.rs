// Keyhook Keystore
// Physically held keys and the outcome their first press was given

use smallvec::SmallVec;

use crate::{Key, KeyEvent};

/// A key held down, with the decision made on its first press.
///
/// Auto-repeated presses and the final release reuse this record, so the
/// application sees a Down/Up pair that agrees even if modifiers or the
/// ruleset change while the key is held.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldKey {
    pub key: Key,
    /// Synthetic events emitted on the first press, replayed on repeats
    pub press: SmallVec<[KeyEvent; 4]>,
    /// Synthetic events owed on release (the up half of a hold overlay)
    pub release: SmallVec<[KeyEvent; 2]>,
    /// Whether the physical press was withheld; the release mirrors it
    pub suppress: bool,
    /// A rule fired on the first press
    pub matched: bool,
}

impl HeldKey {
    /// A press no rule matched: it and its release pass through
    pub fn passed(key: Key) -> Self {
        Self {
            key,
            press: SmallVec::new(),
            release: SmallVec::new(),
            suppress: false,
            matched: false,
        }
    }
}

/// Per-engine record of physically held keys.
#[derive(Debug, Default)]
pub struct Keystore {
    held: SmallVec<[HeldKey; 4]>,
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Held keys whose first press fired a rule
    pub fn matched_len(&self) -> usize {
        self.held.iter().filter(|h| h.matched).count()
    }

    pub fn get(&self, key: Key) -> Option<&HeldKey> {
        self.held.iter().find(|h| h.key == key)
    }

    /// Record a first press. Replaces a stale record for the same key.
    pub fn hold(&mut self, held: HeldKey) {
        if let Some(slot) = self.held.iter_mut().find(|h| h.key == held.key) {
            *slot = held;
        } else {
            self.held.push(held);
        }
    }

    /// Take the record for a released key
    pub fn release(&mut self, key: Key) -> Option<HeldKey> {
        let index = self.held.iter().position(|h| h.key == key)?;
        Some(self.held.remove(index))
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}

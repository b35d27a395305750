// Keyhook Rule Index
// Pre-computed key -> rule positions map, built once per ruleset

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::mapping::Rule;
use crate::Key;

/// Positions of the rules triggered by each key, in declaration order.
///
/// The matcher only walks the rules for the pressed key instead of the
/// whole ruleset.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    by_key: HashMap<Key, SmallVec<[usize; 4]>>,
}

impl RuleIndex {
    pub fn build(rules: &[Rule]) -> Self {
        let mut by_key: HashMap<Key, SmallVec<[usize; 4]>> = HashMap::new();
        for (pos, rule) in rules.iter().enumerate() {
            by_key.entry(rule.trigger.key).or_default().push(pos);
        }
        Self { by_key }
    }

    pub fn positions(&self, key: Key) -> &[usize] {
        self.by_key.get(&key).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// Number of distinct trigger keys
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// Keyhook Rule Matcher
// Picks the single best rule for a key, modifier state and context

use crate::mapping::{Rule, Ruleset, Tier};
use crate::window::Context;
use crate::{Key, ModifierState};

/// A winning rule and why it won
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch<'r> {
    /// Declaration position in the ruleset
    pub position: usize,
    pub rule: &'r Rule,
    pub tier: Tier,
    pub specificity: u32,
}

/// Find the best rule for `key` under `mods` in `ctx`.
///
/// Precedence, highest first:
/// 1. tier: app + window filter, app-only filter, then global rules
/// 2. specificity: more pinned modifier bits wins
/// 3. declaration order: the first-declared rule wins
///
/// A context part that could not be resolved is the literal "unknown", so
/// it only selects global rules or filters naming "unknown".
pub fn find_rule_match<'r>(
    ruleset: &'r Ruleset,
    key: Key,
    mods: ModifierState,
    ctx: &Context<'_>,
) -> Option<RuleMatch<'r>> {
    let mut best: Option<RuleMatch<'r>> = None;

    for (position, rule) in ruleset.candidates(key) {
        if !rule.trigger.matches(key, mods) {
            continue;
        }
        let Some(tier) = rule.tier(ctx) else {
            continue;
        };
        let candidate = RuleMatch {
            position,
            rule,
            tier,
            specificity: rule.trigger.specificity(),
        };
        // Strictly greater: an equal later rule never displaces an earlier one
        let better = match &best {
            None => true,
            Some(current) => (candidate.tier, candidate.specificity) > (current.tier, current.specificity),
        };
        if better {
            best = Some(candidate);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ContextFilter, SyntheticAction};
    use crate::window::WindowMatcher;
    use crate::{Combo, ModifierPattern, Trigger};

    fn tap(key: Key) -> SyntheticAction {
        SyntheticAction::PressRelease(Combo::key(key))
    }

    fn chosen(ruleset: &Ruleset, key: Key, mods: ModifierState, app: &str, window: &str) -> Option<usize> {
        find_rule_match(ruleset, key, mods, &Context::new(app, window)).map(|m| m.position)
    }

    #[test]
    fn test_no_rules_no_match() {
        let ruleset = Ruleset::empty();
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "Finder", ""), None);
    }

    #[test]
    fn test_app_rule_beats_global() {
        let ruleset = Ruleset::new(vec![
            Rule::new(Trigger::bare(Key::K), tap(Key::A)),
            Rule::new(Trigger::bare(Key::K), tap(Key::B)).with_filter(ContextFilter::app("Terminal")),
        ]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "Terminal", "zsh"), Some(1));
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "Finder", "zsh"), Some(0));
    }

    #[test]
    fn test_window_rule_beats_app_rule() {
        let ruleset = Ruleset::new(vec![
            Rule::new(Trigger::bare(Key::K), tap(Key::A)).with_filter(ContextFilter::app("TextEdit")),
            Rule::new(Trigger::bare(Key::K), tap(Key::B)).with_filter(
                ContextFilter::app("TextEdit").with_window(WindowMatcher::Exact("Untitled".to_string())),
            ),
        ]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "TextEdit", "Untitled"), Some(1));
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "TextEdit", "Notes"), Some(0));
    }

    #[test]
    fn test_tier_beats_specificity() {
        // A loose app rule still beats an exact global rule
        let ruleset = Ruleset::new(vec![
            Rule::new(Trigger::bare(Key::K), tap(Key::A)),
            Rule::new(Trigger::new(Key::K, ModifierPattern::any()), tap(Key::B))
                .with_filter(ContextFilter::app("Terminal")),
        ]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "Terminal", ""), Some(1));
    }

    #[test]
    fn test_specificity_within_tier() {
        let ruleset = Ruleset::new(vec![
            Rule::new(Trigger::new(Key::K, ModifierPattern::any()), tap(Key::A)),
            Rule::new(Trigger::new(Key::K, ModifierPattern::exact(ModifierState::CTRL)), tap(Key::B)),
        ]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::CTRL, "Finder", ""), Some(1));
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::SHIFT, "Finder", ""), Some(0));
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let ruleset = Ruleset::new(vec![
            Rule::new(Trigger::bare(Key::K), tap(Key::A)),
            Rule::new(Trigger::bare(Key::K), tap(Key::B)),
        ]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "Finder", ""), Some(0));
    }

    #[test]
    fn test_unknown_context() {
        let ruleset = Ruleset::new(vec![
            Rule::new(Trigger::bare(Key::K), tap(Key::A)).with_filter(ContextFilter::app("Terminal")),
            Rule::new(Trigger::bare(Key::J), tap(Key::B)).with_filter(ContextFilter::app("unknown")),
        ]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::empty(), "", ""), None);
        assert_eq!(chosen(&ruleset, Key::J, ModifierState::empty(), "", ""), Some(1));
    }

    #[test]
    fn test_modifier_mismatch() {
        let ruleset = Ruleset::new(vec![Rule::new(Trigger::bare(Key::K), tap(Key::A))]);
        assert_eq!(chosen(&ruleset, Key::K, ModifierState::META, "Finder", ""), None);
    }
}

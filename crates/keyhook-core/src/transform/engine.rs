// Keyhook Transform Engine
// Per-event decision pipeline: loopback filter, tracking, matching, expansion
//
// One Engine serves one interception point. `handle_key_event` runs on the
// hook's callback thread and never blocks: the ruleset is read through an
// ArcSwap snapshot and all other state is owned by the Engine.

use std::path::Path;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use smallvec::SmallVec;

use crate::config::{Config, ConfigError, ConfigWarning};
use crate::input::{RawKeyEvent, Transition};
use crate::mapping::Ruleset;
use crate::settings::EngineSettings;
use crate::state::{HeldKey, Keystore, ModifierTracker};
use crate::transform::generator::{expand_action, Phase};
use crate::transform::matcher::find_rule_match;
use crate::transform::tagger::{EventTagger, SyntheticEvent};
use crate::window::{Context, WindowContextProvider};
use crate::{Key, KeyEvent, KeyState, ModifierState};

/// Outcome of one physical event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    /// Withhold the physical event from applications
    pub suppress: bool,
    /// Tagged events to inject, in order
    pub events: SmallVec<[SyntheticEvent; 4]>,
}

impl Decision {
    /// Let the physical event through and emit nothing
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn is_pass_through(&self) -> bool {
        !self.suppress && self.events.is_empty()
    }

    /// The untagged key events, for inspection
    pub fn key_events(&self) -> impl Iterator<Item = KeyEvent> + '_ {
        self.events.iter().map(|e| e.event)
    }
}

/// Shared, atomically replaceable ruleset reference.
///
/// Clones share the same slot, so a loader thread can publish a new ruleset
/// while the engine keeps matching against its current snapshot.
#[derive(Debug, Clone)]
pub struct RulesetHandle {
    slot: Arc<ArcSwap<Ruleset>>,
}

impl RulesetHandle {
    pub fn new(ruleset: Ruleset) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(ruleset)),
        }
    }

    /// Lock-free snapshot for the hot path
    pub fn load(&self) -> Guard<Arc<Ruleset>> {
        self.slot.load()
    }

    pub fn snapshot(&self) -> Arc<Ruleset> {
        self.slot.load_full()
    }

    /// Replace the ruleset. In-flight lookups keep the old one.
    pub fn publish(&self, ruleset: Ruleset) {
        self.slot.store(Arc::new(ruleset));
    }

    /// Load the config at `path` and publish its ruleset.
    ///
    /// Engine settings, including the sentinel, keep the values in
    /// `current`; a differing `[engine]` table only logs a warning. On
    /// error the current ruleset stays in place.
    pub fn reload<P: AsRef<Path>>(
        &self,
        path: P,
        current: &EngineSettings,
    ) -> Result<Vec<ConfigWarning>, ConfigError> {
        let config = Config::from_toml_path(path)?;
        if config.settings != *current {
            log::warn!("[engine] settings changed; they take effect on restart");
        }
        let count = config.ruleset.len();
        self.publish(config.ruleset);
        log::debug!("Reloaded ruleset with {} rules", count);
        Ok(config.warnings)
    }
}

/// The remapping decision engine
#[derive(Debug)]
pub struct Engine {
    rules: RulesetHandle,
    tracker: ModifierTracker,
    keystore: Keystore,
    tagger: EventTagger,
    settings: EngineSettings,
    warnings: Vec<ConfigWarning>,
}

impl Engine {
    /// Load the config at `config_path` and build an engine.
    ///
    /// Either returns a fully usable engine or an error; skipped rules are
    /// reported through `warnings()`.
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config = Config::from_toml_path(config_path)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            rules: RulesetHandle::new(config.ruleset),
            tracker: ModifierTracker::new(),
            keystore: Keystore::new(),
            tagger: EventTagger::new(config.settings.sentinel_tag()),
            settings: config.settings,
            warnings: config.warnings,
        }
    }

    /// Engine over an in-memory ruleset with default settings
    pub fn with_ruleset(ruleset: Ruleset) -> Self {
        Self::from_config(Config {
            ruleset,
            settings: EngineSettings::new(),
            warnings: Vec::new(),
            source_path: None,
        })
    }

    /// Decide what to do with one physical event.
    ///
    /// Always returns a decision. Events carrying this engine's sentinel
    /// pass through untouched and are not tracked.
    pub fn handle_key_event(&mut self, raw: &RawKeyEvent, app_name: &str, window_title: &str) -> Decision {
        if self.tagger.is_own(raw.tag) {
            if self.settings.log_events() {
                log::trace!("loopback code={:#04x} passed through", raw.code);
            }
            return Decision::pass();
        }

        let Some(key) = Key::from_code(raw.code) else {
            if self.settings.log_events() {
                log::trace!("unmapped code={:#04x} passed through", raw.code);
            }
            return Decision::pass();
        };

        let state = match raw.transition {
            Transition::Down => KeyState::Down,
            Transition::Up => KeyState::Up,
            Transition::FlagsChanged => match self.tracker.classify_flags_changed(key, raw.flags()) {
                Some(state) => state,
                None => return Decision::pass(),
            },
        };

        let event = KeyEvent::new(key, state, raw.flags());
        self.tracker.apply(&event);

        let decision = match state {
            KeyState::Down => match self.on_repeat(key) {
                Some(decision) => decision,
                None => {
                    // Reported flags cover modifiers held before the engine
                    // started, and overlays this engine is still holding
                    let mods = self.tracker.state() | raw.flags();
                    self.on_press(key, mods, &Context::new(app_name, window_title))
                }
            },
            KeyState::Up => self.on_release(key),
        };

        if self.settings.log_events() {
            log::trace!(
                "{} app={:?} window={:?} -> suppress={} events={}",
                event,
                app_name,
                window_title,
                decision.suppress,
                decision.events.len()
            );
        }
        decision
    }

    /// Like `handle_key_event`, resolving the context through `provider`.
    /// A provider failure is treated as the unknown context.
    pub fn handle_with_provider(&mut self, raw: &RawKeyEvent, provider: &dyn WindowContextProvider) -> Decision {
        let info = provider.get_active_window().unwrap_or_default();
        let ctx = info.context();
        self.handle_key_event(raw, ctx.app_name, ctx.window_title)
    }

    /// A Down for a key that is already held is an auto-repeat: it gets
    /// the first press's outcome again instead of a fresh match
    fn on_repeat(&self, key: Key) -> Option<Decision> {
        let held = self.keystore.get(key)?;
        Some(Decision {
            suppress: held.suppress,
            events: held.press.iter().map(|e| self.tagger.tag(*e)).collect(),
        })
    }

    fn on_press(&mut self, key: Key, mods: ModifierState, ctx: &Context<'_>) -> Decision {
        let rules = self.rules.load();
        let Some(found) = find_rule_match(&rules, key, mods, ctx) else {
            self.keystore.hold(HeldKey::passed(key));
            return Decision::pass();
        };

        let rule = found.rule;
        if self.settings.log_events() {
            log::debug!("{} matched rule[{}] {} ({:?})", key, found.position, rule, found.tier);
        }

        let suppress = !rule.passthrough;
        let press = expand_action(&rule.action, Phase::Press);
        let events = press.iter().map(|e| self.tagger.tag(*e)).collect();
        self.keystore.hold(HeldKey {
            key,
            press,
            release: expand_action(&rule.action, Phase::Release).into_iter().collect(),
            suppress,
            matched: true,
        });
        Decision { suppress, events }
    }

    fn on_release(&mut self, key: Key) -> Decision {
        match self.keystore.release(key) {
            Some(held) => Decision {
                suppress: held.suppress,
                events: held.release.into_iter().map(|e| self.tagger.tag(e)).collect(),
            },
            None => Decision::pass(),
        }
    }

    /// Rebuild the ruleset from `path` and publish it.
    ///
    /// Reads the file on the calling thread. Hosts that must keep config
    /// I/O off the event thread reload through `ruleset_handle()` instead.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.rules.reload(path, &self.settings)
    }

    /// Handle for publishing rulesets from another thread
    pub fn ruleset_handle(&self) -> RulesetHandle {
        self.rules.clone()
    }

    /// Current ruleset snapshot
    pub fn ruleset(&self) -> Arc<Ruleset> {
        self.rules.snapshot()
    }

    /// Forget held modifiers and pending releases, e.g. after the host's
    /// event tap was disabled and events were lost
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.keystore.clear();
    }

    /// Modifiers currently held, per the tracker
    pub fn modifiers(&self) -> ModifierState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &ModifierTracker {
        &self.tracker
    }

    pub fn sentinel_tag(&self) -> i64 {
        self.tagger.sentinel()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Entries skipped when the engine's config was loaded
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Keys whose press fired a rule and are still down
    pub fn pending_releases(&self) -> usize {
        self.keystore.matched_len()
    }

    /// Physical keys the engine currently sees as held
    pub fn held_keys(&self) -> usize {
        self.keystore.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ContextFilter, Rule, SyntheticAction};
    use crate::{Combo, ModifierPattern, Trigger};

    fn caps_to_escape() -> Engine {
        Engine::with_ruleset(Ruleset::new(vec![Rule::new(
            Trigger::new(Key::CapsLock, ModifierPattern::any()),
            SyntheticAction::PressRelease(Combo::key(Key::Escape)),
        )]))
    }

    fn down(key: Key) -> RawKeyEvent {
        RawKeyEvent::key_down(key, ModifierState::empty())
    }

    fn up(key: Key) -> RawKeyEvent {
        RawKeyEvent::key_up(key, ModifierState::empty())
    }

    #[test]
    fn test_match_suppresses_and_emits() {
        let mut engine = caps_to_escape();
        let decision = engine.handle_key_event(&down(Key::CapsLock), "TextEdit", "Untitled");
        assert!(decision.suppress);
        let keys: Vec<KeyEvent> = decision.key_events().collect();
        assert_eq!(
            keys,
            vec![
                KeyEvent::down(Key::Escape, ModifierState::empty()),
                KeyEvent::up(Key::Escape, ModifierState::empty()),
            ]
        );
        assert!(decision.events.iter().all(|e| e.tag == engine.sentinel_tag()));
        assert_eq!(engine.pending_releases(), 1);
    }

    #[test]
    fn test_release_of_consumed_press_is_suppressed() {
        let mut engine = caps_to_escape();
        engine.handle_key_event(&down(Key::CapsLock), "TextEdit", "");
        let decision = engine.handle_key_event(&up(Key::CapsLock), "TextEdit", "");
        assert!(decision.suppress);
        assert!(decision.events.is_empty());
        assert_eq!(engine.pending_releases(), 0);
    }

    #[test]
    fn test_no_match_passes_through() {
        let mut engine = caps_to_escape();
        assert!(engine.handle_key_event(&down(Key::A), "TextEdit", "").is_pass_through());
        assert!(engine.handle_key_event(&up(Key::A), "TextEdit", "").is_pass_through());
    }

    #[test]
    fn test_loopback_ignored() {
        let mut engine = caps_to_escape();
        let tagged = down(Key::CapsLock).with_tag(engine.sentinel_tag());
        assert!(engine.handle_key_event(&tagged, "TextEdit", "").is_pass_through());

        let tagged_shift = down(Key::LeftShift).with_tag(engine.sentinel_tag());
        engine.handle_key_event(&tagged_shift, "TextEdit", "");
        assert_eq!(engine.modifiers(), ModifierState::empty());
    }

    #[test]
    fn test_unmapped_code_passes_through() {
        let mut engine = caps_to_escape();
        let raw = RawKeyEvent::new(0xFF, Transition::Down, ModifierState::empty());
        assert!(engine.handle_key_event(&raw, "", "").is_pass_through());
    }

    #[test]
    fn test_flags_changed_tracks_modifiers() {
        let mut engine = caps_to_escape();
        engine.handle_key_event(&RawKeyEvent::flags_changed(Key::LeftMeta, ModifierState::META), "", "");
        assert_eq!(engine.modifiers(), ModifierState::META);
        engine.handle_key_event(&RawKeyEvent::flags_changed(Key::LeftMeta, ModifierState::empty()), "", "");
        assert_eq!(engine.modifiers(), ModifierState::empty());
    }

    #[test]
    fn test_provider_failure_is_unknown_context() {
        use crate::window::StaticContextProvider;

        let mut engine = Engine::with_ruleset(Ruleset::new(vec![Rule::new(
            Trigger::bare(Key::K),
            SyntheticAction::PressRelease(Combo::key(Key::A)),
        )
        .with_filter(ContextFilter::app("unknown"))]));
        let mut provider = StaticContextProvider::new("Terminal", "zsh");
        assert!(engine.handle_with_provider(&down(Key::K), &provider).is_pass_through());
        engine.handle_with_provider(&up(Key::K), &provider);
        provider.disconnect();
        assert!(engine.handle_with_provider(&down(Key::K), &provider).suppress);
    }

    #[test]
    fn test_reset() {
        let mut engine = caps_to_escape();
        engine.handle_key_event(&down(Key::LeftShift), "", "");
        engine.handle_key_event(&down(Key::CapsLock), "", "");
        engine.reset();
        assert_eq!(engine.modifiers(), ModifierState::empty());
        assert_eq!(engine.pending_releases(), 0);
        // The orphaned release now passes through
        assert!(engine.handle_key_event(&up(Key::CapsLock), "", "").is_pass_through());
    }

    fn k_to_a(trigger: Trigger) -> Engine {
        Engine::with_ruleset(Ruleset::new(vec![Rule::new(
            trigger,
            SyntheticAction::PressRelease(Combo::key(Key::A)),
        )]))
    }

    #[test]
    fn test_repeat_keeps_first_press_outcome_when_suppressed() {
        let mut engine = k_to_a(Trigger::bare(Key::K));
        let first = engine.handle_key_event(&down(Key::K), "", "");
        assert!(first.suppress);

        engine.handle_key_event(&RawKeyEvent::flags_changed(Key::LeftShift, ModifierState::SHIFT), "", "");
        let repeat = engine.handle_key_event(&RawKeyEvent::key_down(Key::K, ModifierState::SHIFT), "", "");
        assert!(repeat.suppress);
        assert_eq!(repeat.key_events().collect::<Vec<_>>(), first.key_events().collect::<Vec<_>>());

        let release = engine.handle_key_event(&RawKeyEvent::key_up(Key::K, ModifierState::SHIFT), "", "");
        assert!(release.suppress);
        assert_eq!(engine.held_keys(), 1);
    }

    #[test]
    fn test_repeat_keeps_first_press_outcome_when_passed() {
        let mut engine = k_to_a(Trigger::new(Key::K, ModifierPattern::exact(ModifierState::CTRL)));
        assert!(engine.handle_key_event(&down(Key::K), "", "").is_pass_through());
        assert_eq!(engine.pending_releases(), 0);

        engine.handle_key_event(&RawKeyEvent::flags_changed(Key::LeftCtrl, ModifierState::CTRL), "", "");
        let repeat = engine.handle_key_event(&RawKeyEvent::key_down(Key::K, ModifierState::CTRL), "", "");
        assert!(repeat.is_pass_through());

        let release = engine.handle_key_event(&RawKeyEvent::key_up(Key::K, ModifierState::CTRL), "", "");
        assert!(release.is_pass_through());

        // A fresh press after the release is matched again
        let fresh = engine.handle_key_event(&RawKeyEvent::key_down(Key::K, ModifierState::CTRL), "", "");
        assert!(fresh.suppress);
    }

    #[test]
    fn test_held_overlay_counts_for_matching() {
        // An overlay the engine holds is reported back by the OS in the
        // flags of later events and takes part in matching
        let mut engine = Engine::with_ruleset(Ruleset::new(vec![
            Rule::new(Trigger::bare(Key::F7), SyntheticAction::HoldOverlay(Combo::key(Key::LeftShift))),
            Rule::new(Trigger::bare(Key::K), SyntheticAction::PressRelease(Combo::key(Key::A))),
            Rule::new(
                Trigger::new(Key::K, ModifierPattern::exact(ModifierState::SHIFT)),
                SyntheticAction::PressRelease(Combo::key(Key::B)),
            ),
        ]));
        let hold = engine.handle_key_event(&down(Key::F7), "", "");
        assert_eq!(
            hold.key_events().collect::<Vec<_>>(),
            vec![KeyEvent::down(Key::LeftShift, ModifierState::empty())]
        );
        // The tracker only sees physical keys
        assert_eq!(engine.modifiers(), ModifierState::empty());

        let decision = engine.handle_key_event(&RawKeyEvent::key_down(Key::K, ModifierState::SHIFT), "", "");
        assert_eq!(decision.key_events().next().map(|e| e.key), Some(Key::B));
    }

    #[test]
    fn test_reload_through_handle_on_another_thread() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[[rule]]\ntrigger = \"j\"\naction = \"b\"\n").unwrap();

        let mut engine = caps_to_escape();
        let handle = engine.ruleset_handle();
        let settings = engine.settings().clone();
        let path = file.path().to_path_buf();
        let warnings = std::thread::spawn(move || handle.reload(&path, &settings))
            .join()
            .unwrap()
            .unwrap();
        assert!(warnings.is_empty());

        assert!(engine.handle_key_event(&down(Key::CapsLock), "", "").is_pass_through());
        assert!(engine.handle_key_event(&down(Key::J), "", "").suppress);
    }

    #[test]
    fn test_publish_through_handle() {
        let mut engine = caps_to_escape();
        let handle = engine.ruleset_handle();
        handle.publish(Ruleset::empty());
        assert!(engine.ruleset().is_empty());
        assert!(engine.handle_key_event(&down(Key::CapsLock), "", "").is_pass_through());
    }
}

// Keyhook Core Library
// Keyboard remapping decision engine: rules, modifier tracking, synthetic events

pub mod action;
pub mod combo;
pub mod config;
pub mod input;
pub mod key;
pub mod keycode;
pub mod mapping;
pub mod modifier;
pub mod settings;
pub mod state;
pub mod transform;
pub mod trigger;
pub mod window;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use action::KeyState;
pub use combo::Combo;
pub use config::{
    parse_combo_string, parse_trigger_string, ComboParseError, Config, ConfigError, ConfigWarning,
};
pub use input::{KeyEvent, RawKeyEvent, Transition};
pub use key::Key;
pub use mapping::{ActionStep, ContextFilter, Rule, Ruleset, SyntheticAction, Tier};
pub use modifier::{Modifier, ModifierError, ModifierPattern, ModifierState, Side};
pub use settings::{EngineSettings, SettingsError};
pub use state::{Keystore, ModifierTracker};
pub use transform::{find_rule_match, Decision, Engine, EventTagger, RuleMatch, RulesetHandle, SyntheticEvent};
pub use trigger::Trigger;
pub use window::{Context, WindowContextProvider, WindowError, WindowInfo, WindowMatcher};

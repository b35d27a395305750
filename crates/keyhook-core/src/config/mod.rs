// Keyhook Config API
// Config file loading, combo/trigger parsing and action expansion

pub mod action_expander;
pub mod combo_parser;
pub mod parser;

pub use action_expander::{expand_action, parse_step, ActionToml, ExpandError, NamedActions};
pub use combo_parser::{parse_combo_string, parse_trigger_string, ComboParseError};
pub use parser::{Config, ConfigError, ConfigToml, ConfigWarning};

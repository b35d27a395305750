// Keyhook Settings Module
// Engine-wide settings from the [engine] table and the default config location

use std::path::PathBuf;

use serde::Deserialize;

use crate::input::UNTAGGED;
use crate::transform::tagger::DEFAULT_SENTINEL;

/// Engine settings, fixed for the lifetime of an engine.
///
/// Loaded from the `[engine]` table of the config file:
///
/// ```toml
/// [engine]
/// sentinel_tag = 0x6b686f6f6b
/// log_events = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Value stamped into synthetic events' user-data slot
    sentinel_tag: i64,

    /// Trace every decision through `log`
    log_events: bool,
}

/// Errors that can occur when validating settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation of the `[engine]` table
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineToml {
    #[serde(default)]
    pub sentinel_tag: Option<i64>,

    #[serde(default)]
    pub log_events: Option<bool>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sentinel_tag: DEFAULT_SENTINEL,
            log_events: false,
        }
    }
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and apply an `[engine]` table over the defaults
    pub fn from_toml(section: &EngineToml) -> Result<Self, SettingsError> {
        let mut settings = Self::new();
        if let Some(tag) = section.sentinel_tag {
            settings.set_sentinel_tag(tag)?;
        }
        if let Some(log_events) = section.log_events {
            settings.log_events = log_events;
        }
        Ok(settings)
    }

    /// Get the default config path (~/.config/keyhook/config.toml)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keyhook").join("config.toml"))
    }

    pub fn sentinel_tag(&self) -> i64 {
        self.sentinel_tag
    }

    /// Untagged platform events carry 0, so 0 can never be the sentinel
    pub fn set_sentinel_tag(&mut self, tag: i64) -> Result<(), SettingsError> {
        if tag == UNTAGGED {
            return Err(SettingsError::InvalidValue(
                "sentinel_tag must be non-zero".to_string(),
            ));
        }
        self.sentinel_tag = tag;
        Ok(())
    }

    pub fn log_events(&self) -> bool {
        self.log_events
    }

    pub fn set_log_events(&mut self, enabled: bool) {
        self.log_events = enabled;
    }
}

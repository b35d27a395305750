// Keyhook Config Parser - TOML with Serde
// Loads rules, named actions and contexts into a Ruleset

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use super::action_expander::{expand_action, ActionToml, NamedActions};
use super::combo_parser::parse_trigger_string;
use crate::mapping::{ContextFilter, Rule, Ruleset};
use crate::settings::{EngineSettings, EngineToml, SettingsError};
use crate::window::WindowMatcher;

/// Fatal configuration errors. The engine is not created.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// A rule, named action or context that was skipped while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Which entry, e.g. `rule[3] "caps"` or `action "greet"`
    pub entry: String,
    pub reason: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.entry, self.reason)
    }
}

/// Root TOML table
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// Engine settings
    #[serde(default)]
    pub engine: Option<EngineToml>,

    /// Named action templates, referenced as "@name"
    #[serde(default)]
    pub actions: IndexMap<String, toml::Value>,

    /// Named contexts: app alias sets with their own actions and an
    /// optional parent
    #[serde(default)]
    pub contexts: IndexMap<String, toml::Value>,

    /// Rules in precedence tie-break order. Kept as raw values so one bad
    /// entry does not reject the file.
    #[serde(default)]
    pub rule: Vec<toml::Value>,
}

/// One or several app names
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AppToml {
    Single(String),
    Multiple(Vec<String>),
}

impl AppToml {
    fn into_vec(self) -> Vec<String> {
        match self {
            AppToml::Single(app) => vec![app],
            AppToml::Multiple(apps) => apps,
        }
    }
}

/// `[contexts.<name>]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextToml {
    /// Omitted for contexts that only group actions for their children
    #[serde(default)]
    pub apps: Option<AppToml>,
    #[serde(default)]
    pub parent: Option<String>,
    /// `[contexts.<name>.actions]`, visible to rules in this context and
    /// its descendants
    #[serde(default)]
    pub actions: IndexMap<String, toml::Value>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub window_pattern: Option<String>,
}

/// A loaded context
#[derive(Debug, Clone)]
struct ContextScope {
    /// `None` when the context lists no apps
    filter: Option<ContextFilter>,
    /// Own actions over the parent chain's over the global ones
    actions: NamedActions,
}

/// `[[rule]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleToml {
    #[serde(default)]
    pub name: Option<String>,
    pub trigger: String,
    pub action: ActionToml,
    #[serde(default)]
    pub app: Option<AppToml>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub window_pattern: Option<String>,
    #[serde(default)]
    pub hold: bool,
    #[serde(default)]
    pub passthrough: bool,
}

/// A fully loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ruleset: Ruleset,
    pub settings: EngineSettings,
    /// Entries skipped while loading
    pub warnings: Vec<ConfigWarning>,
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.source_path = Some(path.to_path_buf());
        log::debug!(
            "Loaded {} rules from {} ({} skipped)",
            config.ruleset.len(),
            path.display(),
            config.warnings.len()
        );
        Ok(config)
    }

    /// Load configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }
}

impl ConfigToml {
    /// Resolve into a `Config`. Bad entries become warnings; only invalid
    /// engine settings are fatal here.
    pub fn to_config(self) -> Result<Config, ConfigError> {
        let settings = match &self.engine {
            Some(section) => EngineSettings::from_toml(section)?,
            None => EngineSettings::new(),
        };

        let mut warnings = Vec::new();
        let mut named = NamedActions::new();
        extend_named_actions(&mut named, &self.actions, |name| format!("action {:?}", name), &mut warnings);
        let contexts = resolve_contexts(&self.contexts, &named, &mut warnings);

        let mut rules = Vec::with_capacity(self.rule.len());
        for (index, value) in self.rule.into_iter().enumerate() {
            let label = rule_label(index, &value);
            let parsed = value
                .try_into::<RuleToml>()
                .map_err(|e| e.to_string())
                .and_then(|entry| build_rule(entry, &named, &contexts));
            match parsed {
                Ok(rule) => rules.push(rule),
                Err(reason) => skip(&mut warnings, label, reason),
            }
        }

        Ok(Config {
            ruleset: Ruleset::new(rules),
            settings,
            warnings,
            source_path: None,
        })
    }
}

fn skip(warnings: &mut Vec<ConfigWarning>, entry: String, reason: String) {
    log::warn!("Skipping {} in config: {}", entry, reason);
    warnings.push(ConfigWarning { entry, reason });
}

fn rule_label(index: usize, value: &toml::Value) -> String {
    match value.get("name").and_then(|n| n.as_str()) {
        Some(name) => format!("rule[{}] {:?}", index, name),
        None => format!("rule[{}]", index),
    }
}

/// Resolve `raw` into `named`. Actions may reference earlier ones and
/// anything already in `named`; forward references fail. A failed action
/// hides any inherited action of the same name.
fn extend_named_actions(
    named: &mut NamedActions,
    raw: &IndexMap<String, toml::Value>,
    label: impl Fn(&str) -> String,
    warnings: &mut Vec<ConfigWarning>,
) {
    for (name, value) in raw {
        let resolved = value
            .clone()
            .try_into::<ActionToml>()
            .map_err(|e| e.to_string())
            .and_then(|action| expand_action(&action, false, named).map_err(|e| e.to_string()));
        match resolved {
            Ok(action) => {
                named.insert(name.clone(), action);
            }
            Err(reason) => {
                named.shift_remove(name);
                skip(warnings, label(name.as_str()), reason);
            }
        }
    }
}

fn resolve_contexts(
    raw: &IndexMap<String, toml::Value>,
    global: &NamedActions,
    warnings: &mut Vec<ConfigWarning>,
) -> IndexMap<String, ContextScope> {
    let mut parsed = IndexMap::new();
    for (name, value) in raw {
        let resolved = value
            .clone()
            .try_into::<ContextToml>()
            .map_err(|e| e.to_string())
            .and_then(|ctx| {
                let filter = match ctx.apps.clone() {
                    Some(apps) => Some(build_filter(apps.into_vec(), ctx.window.clone(), ctx.window_pattern.clone())?),
                    None if ctx.window.is_some() || ctx.window_pattern.is_some() => {
                        return Err("window filter requires apps".to_string())
                    }
                    None => None,
                };
                Ok((ctx, filter))
            });
        match resolved {
            Ok(entry) => {
                parsed.insert(name.clone(), entry);
            }
            Err(reason) => skip(warnings, format!("context {:?}", name), reason),
        }
    }

    // Drop parent links that name a missing context or close a loop
    let mut parents: IndexMap<String, Option<String>> = parsed
        .iter()
        .map(|(name, (ctx, _))| (name.clone(), ctx.parent.clone()))
        .collect();
    for name in parsed.keys() {
        let Some(parent) = parents[name].clone() else {
            continue;
        };
        let reason = if !parents.contains_key(&parent) {
            format!("parent context '{}' not found", parent)
        } else if leads_to(&parents, &parent, name) {
            format!("parent context '{}' leads back to '{}'", parent, name)
        } else {
            continue;
        };
        skip(warnings, format!("parent of context {:?}", name), reason);
        parents[name] = None;
    }

    let mut scopes = IndexMap::new();
    for name in parsed.keys() {
        context_actions(name, &parsed, &parents, global, &mut scopes, warnings);
    }

    parsed
        .into_iter()
        .map(|(name, (_, filter))| {
            let actions = scopes.shift_remove(&name).unwrap_or_else(|| global.clone());
            (name, ContextScope { filter, actions })
        })
        .collect()
}

/// Whether following parents from `start` reaches `target`
fn leads_to(parents: &IndexMap<String, Option<String>>, start: &str, target: &str) -> bool {
    let mut current = Some(start);
    // A loop elsewhere in the chain ends the walk after one lap
    for _ in 0..=parents.len() {
        match current {
            Some(name) if name == target => return true,
            Some(name) => current = parents.get(name).and_then(|p| p.as_deref()),
            None => return false,
        }
    }
    false
}

/// Actions visible in context `name`: the parent's (or the global ones),
/// extended with its own. Parents are resolved first and memoized.
fn context_actions(
    name: &str,
    parsed: &IndexMap<String, (ContextToml, Option<ContextFilter>)>,
    parents: &IndexMap<String, Option<String>>,
    global: &NamedActions,
    scopes: &mut IndexMap<String, NamedActions>,
    warnings: &mut Vec<ConfigWarning>,
) {
    if scopes.contains_key(name) {
        return;
    }
    let mut actions = match parents.get(name).and_then(|p| p.as_deref()) {
        Some(parent) => {
            context_actions(parent, parsed, parents, global, scopes, warnings);
            scopes.get(parent).cloned().unwrap_or_else(|| global.clone())
        }
        None => global.clone(),
    };
    if let Some((ctx, _)) = parsed.get(name) {
        extend_named_actions(
            &mut actions,
            &ctx.actions,
            |action| format!("action {:?} in context {:?}", action, name),
            warnings,
        );
    }
    scopes.insert(name.to_string(), actions);
}

fn window_matcher(window: Option<String>, pattern: Option<String>) -> Result<Option<WindowMatcher>, String> {
    match (window, pattern) {
        (Some(_), Some(_)) => Err("window and window_pattern are mutually exclusive".to_string()),
        (Some(title), None) => Ok(Some(WindowMatcher::Exact(title))),
        (None, Some(pattern)) => Regex::new(&pattern)
            .map(|re| Some(WindowMatcher::Pattern(re)))
            .map_err(|e| format!("invalid window_pattern: {}", e)),
        (None, None) => Ok(None),
    }
}

fn build_filter(apps: Vec<String>, window: Option<String>, pattern: Option<String>) -> Result<ContextFilter, String> {
    if apps.is_empty() {
        return Err("app list is empty".to_string());
    }
    if apps.iter().any(|app| app.trim().is_empty()) {
        return Err("app names cannot be empty".to_string());
    }
    Ok(ContextFilter {
        apps,
        window: window_matcher(window, pattern)?,
    })
}

fn build_rule(
    entry: RuleToml,
    named: &NamedActions,
    contexts: &IndexMap<String, ContextScope>,
) -> Result<Rule, String> {
    let trigger = parse_trigger_string(&entry.trigger).map_err(|e| format!("invalid trigger '{}': {}", entry.trigger, e))?;

    let (filter, named) = match (entry.app, entry.context) {
        (Some(_), Some(_)) => return Err("app and context are mutually exclusive".to_string()),
        (Some(apps), None) => (
            Some(build_filter(apps.into_vec(), entry.window, entry.window_pattern)?),
            named,
        ),
        (None, Some(name)) => {
            let context = contexts
                .get(&name)
                .ok_or_else(|| format!("unknown context '{}'", name))?;
            let mut filter = context
                .filter
                .clone()
                .ok_or_else(|| format!("context '{}' lists no apps", name))?;
            // A rule-level window condition overrides the context's
            if let Some(window) = window_matcher(entry.window, entry.window_pattern)? {
                filter.window = Some(window);
            }
            (Some(filter), &context.actions)
        }
        (None, None) => {
            if entry.window.is_some() || entry.window_pattern.is_some() {
                return Err("window filter requires app or context".to_string());
            }
            (None, named)
        }
    };
    let action = expand_action(&entry.action, entry.hold, named).map_err(|e| e.to_string())?;

    Ok(Rule {
        name: entry.name,
        trigger,
        filter,
        action,
        passthrough: entry.passthrough,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ActionStep, SyntheticAction};
    use crate::{Combo, Key, ModifierPattern, ModifierState};

    #[test]
    fn test_empty_config() {
        let config = Config::from_toml("").unwrap();
        assert!(config.ruleset.is_empty());
        assert!(config.warnings.is_empty());
        assert_eq!(config.settings, EngineSettings::new());
    }

    #[test]
    fn test_basic_rule() {
        let config = Config::from_toml(
            r#"
            [[rule]]
            name = "caps to escape"
            trigger = "*-capsLock"
            action = "escape"
            "#,
        )
        .unwrap();
        let rule = &config.ruleset.rules()[0];
        assert_eq!(rule.name.as_deref(), Some("caps to escape"));
        assert_eq!(rule.trigger.key, Key::CapsLock);
        assert_eq!(rule.trigger.pattern, ModifierPattern::any());
        assert_eq!(rule.action, SyntheticAction::PressRelease(Combo::key(Key::Escape)));
        assert!(rule.filter.is_none());
        assert!(!rule.passthrough);
    }

    #[test]
    fn test_app_and_window_filters() {
        let config = Config::from_toml(
            r#"
            [[rule]]
            trigger = "k"
            action = "a"
            app = ["Terminal", "iTerm2"]

            [[rule]]
            trigger = "k"
            action = "b"
            app = "TextEdit"
            window_pattern = "^Untitled"
            "#,
        )
        .unwrap();
        let rules = config.ruleset.rules();
        let filter = rules[0].filter.as_ref().unwrap();
        assert_eq!(filter.apps, vec!["Terminal".to_string(), "iTerm2".to_string()]);
        assert!(filter.window.is_none());
        assert!(matches!(rules[1].filter.as_ref().unwrap().window, Some(WindowMatcher::Pattern(_))));
    }

    #[test]
    fn test_named_context() {
        let config = Config::from_toml(
            r#"
            [contexts.terminal]
            apps = ["Terminal", "iTerm2"]

            [[rule]]
            trigger = "Ctrl-k"
            action = "Meta-k"
            context = "terminal"
            window = "zsh"
            "#,
        )
        .unwrap();
        let filter = config.ruleset.rules()[0].filter.as_ref().unwrap();
        assert_eq!(filter.apps.len(), 2);
        assert_eq!(filter.window, Some(WindowMatcher::Exact("zsh".to_string())));
    }

    #[test]
    fn test_named_actions() {
        let config = Config::from_toml(
            r#"
            [actions]
            word_left = "Alt-left"
            greet = ['"hi"', "@word_left"]

            [[rule]]
            trigger = "F1"
            action = "@greet"
            "#,
        )
        .unwrap();
        assert!(config.warnings.is_empty());
        assert_eq!(
            config.ruleset.rules()[0].action,
            SyntheticAction::Sequence(vec![
                ActionStep::Text("hi".to_string()),
                ActionStep::Tap(Combo::new(Key::LeftArrow, ModifierState::ALT)),
            ])
        );
    }

    #[test]
    fn test_context_actions_resolve_through_parents() {
        let config = Config::from_toml(
            r#"
            [actions]
            line_start = "Ctrl-a"
            line_end = "Ctrl-e"

            [contexts.editor]
            [contexts.editor.actions]
            line_start = "Meta-left"

            [contexts.code]
            apps = "Code"
            parent = "editor"

            [contexts.code.actions]
            line_end = "Meta-right"

            [[rule]]
            trigger = "Alt-a"
            action = "@line_start"
            context = "code"

            [[rule]]
            trigger = "Alt-e"
            action = "@line_end"
            context = "code"

            [[rule]]
            trigger = "Alt-a"
            action = "@line_start"
            "#,
        )
        .unwrap();
        assert!(config.warnings.is_empty());
        let rules = config.ruleset.rules();
        // Inherited from the parent over the global one
        assert_eq!(rules[0].action, SyntheticAction::PressRelease(Combo::new(Key::LeftArrow, ModifierState::META)));
        // Own action
        assert_eq!(rules[1].action, SyntheticAction::PressRelease(Combo::new(Key::RightArrow, ModifierState::META)));
        // Unscoped rules only see the global actions
        assert_eq!(rules[2].action, SyntheticAction::PressRelease(Combo::new(Key::A, ModifierState::CTRL)));
    }

    #[test]
    fn test_context_falls_back_to_global_actions() {
        let config = Config::from_toml(
            r#"
            [actions]
            greet = '"hi"'

            [contexts.terminal]
            apps = "Terminal"

            [contexts.terminal.actions]
            greet_twice = ["@greet", "@greet"]

            [[rule]]
            trigger = "F1"
            action = "@greet_twice"
            context = "terminal"

            [[rule]]
            trigger = "F2"
            action = "@greet_twice"
            "#,
        )
        .unwrap();
        assert_eq!(config.ruleset.len(), 1);
        assert_eq!(
            config.ruleset.rules()[0].action,
            SyntheticAction::Sequence(vec![
                ActionStep::Text("hi".to_string()),
                ActionStep::Text("hi".to_string()),
            ])
        );
        // greet_twice is not visible outside the context
        assert_eq!(config.warnings.len(), 1);
        assert_eq!(config.warnings[0].entry, "rule[1]");
    }

    #[test]
    fn test_unknown_parent_is_dropped_with_warning() {
        let config = Config::from_toml(
            r#"
            [actions]
            jump = "Ctrl-a"

            [contexts.terminal]
            apps = "Terminal"
            parent = "shell"

            [[rule]]
            trigger = "Alt-a"
            action = "@jump"
            context = "terminal"
            "#,
        )
        .unwrap();
        assert_eq!(config.ruleset.len(), 1);
        assert_eq!(config.warnings.len(), 1);
        assert_eq!(config.warnings[0].entry, "parent of context \"terminal\"");
        assert!(config.warnings[0].reason.contains("shell"));
    }

    #[test]
    fn test_parent_loop_is_broken_with_warning() {
        let config = Config::from_toml(
            r#"
            [contexts.a]
            apps = "A"
            parent = "b"

            [contexts.a.actions]
            go = "Ctrl-a"

            [contexts.b]
            apps = "B"
            parent = "a"

            [[rule]]
            trigger = "k"
            action = "@go"
            context = "b"
            "#,
        )
        .unwrap();
        // The first context's link closes the loop and is dropped; b still
        // inherits from a
        assert_eq!(config.warnings.len(), 1);
        assert_eq!(config.warnings[0].entry, "parent of context \"a\"");
        assert_eq!(config.ruleset.len(), 1);
    }

    #[test]
    fn test_app_less_context_cannot_scope_rules() {
        let config = Config::from_toml(
            r#"
            [contexts.base]
            [contexts.base.actions]
            go = "Ctrl-a"

            [[rule]]
            trigger = "k"
            action = "@go"
            context = "base"
            "#,
        )
        .unwrap();
        assert!(config.ruleset.is_empty());
        assert!(config.warnings[0].reason.contains("lists no apps"));
    }

    #[test]
    fn test_bad_rule_skipped_with_warning() {
        let config = Config::from_toml(
            r#"
            [[rule]]
            trigger = "Hyper-k"
            action = "a"

            [[rule]]
            name = "typo"
            trigger = "k"
            acton = "a"

            [[rule]]
            trigger = "j"
            action = "b"
            "#,
        )
        .unwrap();
        assert_eq!(config.ruleset.len(), 1);
        assert_eq!(config.ruleset.rules()[0].trigger.key, Key::J);
        assert_eq!(config.warnings.len(), 2);
        assert_eq!(config.warnings[0].entry, "rule[0]");
        assert_eq!(config.warnings[1].entry, "rule[1] \"typo\"");
    }

    #[test]
    fn test_conflicting_filters_skipped() {
        let config = Config::from_toml(
            r#"
            [[rule]]
            trigger = "k"
            action = "a"
            app = "Terminal"
            context = "terminal"

            [[rule]]
            trigger = "k"
            action = "a"
            window = "x"

            [[rule]]
            trigger = "k"
            action = "a"
            app = "Terminal"
            window_pattern = "(["
            "#,
        )
        .unwrap();
        assert!(config.ruleset.is_empty());
        assert_eq!(config.warnings.len(), 3);
    }

    #[test]
    fn test_bad_named_action_skips_dependents() {
        let config = Config::from_toml(
            r#"
            [actions]
            broken = "Ctrl-nope"

            [[rule]]
            trigger = "k"
            action = "@broken"
            "#,
        )
        .unwrap();
        assert!(config.ruleset.is_empty());
        assert_eq!(config.warnings.len(), 2);
        assert_eq!(config.warnings[0].entry, "action \"broken\"");
    }

    #[test]
    fn test_structural_errors_are_fatal() {
        assert!(matches!(Config::from_toml("[[rule]"), Err(ConfigError::TomlParse(_))));
        assert!(matches!(Config::from_toml("[unknown]\nx = 1"), Err(ConfigError::TomlParse(_))));
        assert!(matches!(Config::from_toml("rule = 5"), Err(ConfigError::TomlParse(_))));
        assert!(matches!(
            Config::from_toml("[engine]\nsentinel_tag = 0"),
            Err(ConfigError::Settings(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_toml_path("/nonexistent/keyhook/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/keyhook/config.toml"));
    }

    #[test]
    fn test_engine_section() {
        let config = Config::from_toml("[engine]\nsentinel_tag = 99\nlog_events = true").unwrap();
        assert_eq!(config.settings.sentinel_tag(), 99);
        assert!(config.settings.log_events());
    }

    #[test]
    fn test_hold_and_passthrough() {
        let config = Config::from_toml(
            r#"
            [[rule]]
            trigger = "rightOption"
            action = "Shift-Alt-x"
            hold = true
            passthrough = true
            "#,
        )
        .unwrap();
        let rule = &config.ruleset.rules()[0];
        assert!(rule.passthrough);
        assert!(matches!(rule.action, SyntheticAction::HoldOverlay(_)));
    }
}

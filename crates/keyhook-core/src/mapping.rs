// Keyhook Mapping Types
// Rules, their context filters and the synthetic actions they emit

use std::fmt;

use crate::transform::cache::RuleIndex;
use crate::window::{Context, WindowMatcher};
use crate::{Combo, Key, Trigger};

/// One step of a sequence action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStep {
    /// Key down with overlay
    Press(Combo),
    /// Key up with overlay
    Release(Combo),
    /// Down then up
    Tap(Combo),
    /// Type literal text, one tap per character
    Text(String),
}

/// What a rule emits. Closed set so expansion stays exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticAction {
    /// Down and up on press, nothing on release
    PressRelease(Combo),
    /// Down on press, up on release
    HoldOverlay(Combo),
    /// Ordered steps on press, nothing on release
    Sequence(Vec<ActionStep>),
}

impl fmt::Display for ActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStep::Press(c) => write!(f, "press {}", c),
            ActionStep::Release(c) => write!(f, "release {}", c),
            ActionStep::Tap(c) => write!(f, "{}", c),
            ActionStep::Text(text) => write!(f, "{:?}", text),
        }
    }
}

impl fmt::Display for SyntheticAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntheticAction::PressRelease(c) => write!(f, "{}", c),
            SyntheticAction::HoldOverlay(c) => write!(f, "hold {}", c),
            SyntheticAction::Sequence(steps) => {
                let parts: Vec<String> = steps.iter().map(|s| s.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Precedence tier of a matching rule, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Global,
    App,
    AppAndWindow,
}

/// Context filter: a set of app names plus an optional window condition
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFilter {
    /// App names that select this rule, compared exactly
    pub apps: Vec<String>,
    pub window: Option<WindowMatcher>,
}

impl ContextFilter {
    pub fn app(name: &str) -> Self {
        Self {
            apps: vec![name.to_string()],
            window: None,
        }
    }

    pub fn with_window(mut self, window: WindowMatcher) -> Self {
        self.window = Some(window);
        self
    }

    /// Tier this filter reaches for `ctx`, or `None` if it does not match
    pub fn tier(&self, ctx: &Context<'_>) -> Option<Tier> {
        if !self.apps.iter().any(|app| app == ctx.app_name) {
            return None;
        }
        match &self.window {
            None => Some(Tier::App),
            Some(window) if window.matches(ctx.window_title) => Some(Tier::AppAndWindow),
            Some(_) => None,
        }
    }
}

impl fmt::Display for ContextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app in [{}]", self.apps.join(", "))?;
        if let Some(window) = &self.window {
            write!(f, ", {}", window)?;
        }
        Ok(())
    }
}

/// A remap rule
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: Option<String>,
    pub trigger: Trigger,
    /// `None` applies in every context
    pub filter: Option<ContextFilter>,
    pub action: SyntheticAction,
    /// Emit the action but also let the original event through
    pub passthrough: bool,
}

impl Rule {
    pub fn new(trigger: Trigger, action: SyntheticAction) -> Self {
        Self {
            name: None,
            trigger,
            filter: None,
            action,
            passthrough: false,
        }
    }

    pub fn with_filter(mut self, filter: ContextFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn tier(&self, ctx: &Context<'_>) -> Option<Tier> {
        match &self.filter {
            None => Some(Tier::Global),
            Some(filter) => filter.tier(ctx),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.trigger, self.action)?;
        if let Some(filter) = &self.filter {
            write!(f, " ({})", filter)?;
        }
        if self.passthrough {
            write!(f, " +passthrough")?;
        }
        Ok(())
    }
}

/// Immutable, ordered rule collection with a per-key index.
///
/// Built once and never mutated; a reload builds a new one.
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    rules: Vec<Rule>,
    index: RuleIndex,
}

impl Ruleset {
    pub fn new(rules: Vec<Rule>) -> Self {
        let index = RuleIndex::build(&rules);
        Self { rules, index }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules triggered by `key`, in declaration order, with their positions
    pub fn candidates(&self, key: Key) -> impl Iterator<Item = (usize, &Rule)> + '_ {
        self.index
            .positions(key)
            .iter()
            .map(move |&pos| (pos, &self.rules[pos]))
    }
}

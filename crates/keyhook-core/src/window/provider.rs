// Window Context Provider Trait
//
// This module defines the interface for window context providers, which
// report the foreground application and window title, and the borrowed
// per-event context the matcher consumes.

use std::fmt;

use regex::Regex;

/// Wildcard substituted for a missing app name or window title
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Error type for window context operations
#[derive(Debug, Clone, PartialEq)]
pub enum WindowError {
    /// Not connected to the window server
    NotConnected,

    /// Connection failed
    ConnectionFailed(String),

    /// Query failed
    QueryFailed(String),
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::NotConnected => write!(f, "Not connected to window server"),
            WindowError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            WindowError::QueryFailed(msg) => write!(f, "Query failed: {}", msg),
        }
    }
}

impl std::error::Error for WindowError {}

/// Owned foreground window information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    /// Application name (e.g. "Terminal", "Safari")
    pub app_name: Option<String>,

    /// Window title (e.g. "Untitled")
    pub window_title: Option<String>,
}

impl WindowInfo {
    /// Create a new empty WindowInfo
    pub fn new() -> Self {
        Self::default()
    }

    /// Create WindowInfo with app name and title
    pub fn with_details(app_name: Option<String>, window_title: Option<String>) -> Self {
        Self { app_name, window_title }
    }

    /// Borrow as a matching context, substituting "unknown" for missing parts
    pub fn context(&self) -> Context<'_> {
        Context::new(
            self.app_name.as_deref().unwrap_or(""),
            self.window_title.as_deref().unwrap_or(""),
        )
    }
}

/// Context of a single lookup. Never stored across events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context<'a> {
    pub app_name: &'a str,
    pub window_title: &'a str,
}

impl<'a> Context<'a> {
    /// Empty or whitespace-only parts become "unknown"
    pub fn new(app_name: &'a str, window_title: &'a str) -> Self {
        Self {
            app_name: normalize(app_name),
            window_title: normalize(window_title),
        }
    }

    pub fn unknown() -> Self {
        Self {
            app_name: UNKNOWN_CONTEXT,
            window_title: UNKNOWN_CONTEXT,
        }
    }
}

fn normalize(part: &str) -> &str {
    if part.trim().is_empty() {
        UNKNOWN_CONTEXT
    } else {
        part
    }
}

/// Window title condition of a context filter
#[derive(Debug, Clone)]
pub enum WindowMatcher {
    /// Exact title
    Exact(String),

    /// Regular expression searched anywhere in the title
    Pattern(Regex),
}

impl WindowMatcher {
    pub fn matches(&self, title: &str) -> bool {
        match self {
            WindowMatcher::Exact(expected) => expected == title,
            WindowMatcher::Pattern(re) => re.is_match(title),
        }
    }
}

impl PartialEq for WindowMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (WindowMatcher::Exact(a), WindowMatcher::Exact(b)) => a == b,
            (WindowMatcher::Pattern(a), WindowMatcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for WindowMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowMatcher::Exact(title) => write!(f, "window == {:?}", title),
            WindowMatcher::Pattern(re) => write!(f, "window =~ /{}/", re.as_str()),
        }
    }
}

/// Trait for window context providers
///
/// Implementations report the foreground window from a platform API.
/// The engine only consumes the resulting strings.
pub trait WindowContextProvider: Send + Sync {
    /// Connect to the window server
    fn connect(&mut self) -> Result<(), WindowError>;

    /// Disconnect and release resources
    fn disconnect(&mut self);

    /// Check if connected to the window server
    fn is_connected(&self) -> bool;

    /// Get the current foreground window
    fn get_active_window(&self) -> Result<WindowInfo, WindowError>;

    /// Check if window context is available
    fn is_available(&self) -> bool {
        self.is_connected() && self.get_active_window().is_ok()
    }
}

/// Provider that always reports the same window. Used for replay and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticContextProvider {
    info: WindowInfo,
    connected: bool,
}

impl StaticContextProvider {
    pub fn new(app_name: &str, window_title: &str) -> Self {
        Self {
            info: WindowInfo::with_details(Some(app_name.to_string()), Some(window_title.to_string())),
            connected: true,
        }
    }

    /// Switch the reported window
    pub fn set_active(&mut self, app_name: &str, window_title: &str) {
        self.info = WindowInfo::with_details(Some(app_name.to_string()), Some(window_title.to_string()));
    }
}

impl WindowContextProvider for StaticContextProvider {
    fn connect(&mut self) -> Result<(), WindowError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn get_active_window(&self) -> Result<WindowInfo, WindowError> {
        if self.connected {
            Ok(self.info.clone())
        } else {
            Err(WindowError::NotConnected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_info_new() {
        let info = WindowInfo::new();
        assert_eq!(info.app_name, None);
        assert_eq!(info.window_title, None);
        assert_eq!(info.context(), Context::unknown());
    }

    #[test]
    fn test_window_info_context() {
        let info = WindowInfo::with_details(Some("Terminal".to_string()), Some("bash".to_string()));
        let ctx = info.context();
        assert_eq!(ctx.app_name, "Terminal");
        assert_eq!(ctx.window_title, "bash");
    }

    #[test]
    fn test_context_normalizes_empty() {
        let ctx = Context::new("", "  ");
        assert_eq!(ctx.app_name, UNKNOWN_CONTEXT);
        assert_eq!(ctx.window_title, UNKNOWN_CONTEXT);
        assert_eq!(Context::new("Finder", "").app_name, "Finder");
    }

    #[test]
    fn test_window_matcher_exact() {
        let matcher = WindowMatcher::Exact("Untitled".to_string());
        assert!(matcher.matches("Untitled"));
        assert!(!matcher.matches("Untitled 2"));
        assert!(!matcher.matches("untitled"));
    }

    #[test]
    fn test_window_matcher_pattern() {
        let matcher = WindowMatcher::Pattern(Regex::new("^Untitled( \\d+)?$").unwrap());
        assert!(matcher.matches("Untitled"));
        assert!(matcher.matches("Untitled 2"));
        assert!(!matcher.matches("Notes"));
    }

    #[test]
    fn test_window_matcher_eq() {
        let a = WindowMatcher::Pattern(Regex::new("x+").unwrap());
        let b = WindowMatcher::Pattern(Regex::new("x+").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, WindowMatcher::Exact("x+".to_string()));
    }

    #[test]
    fn test_static_provider() {
        let mut provider = StaticContextProvider::new("Safari", "GitHub");
        assert!(provider.is_available());
        assert_eq!(
            provider.get_active_window().unwrap().app_name.as_deref(),
            Some("Safari")
        );
        provider.set_active("Terminal", "zsh");
        assert_eq!(
            provider.get_active_window().unwrap().window_title.as_deref(),
            Some("zsh")
        );
        provider.disconnect();
        assert_eq!(provider.get_active_window(), Err(WindowError::NotConnected));
        assert!(!provider.is_available());
    }
}

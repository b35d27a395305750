//! Window context module
//!
//! Foreground application and window identity as seen by the rule matcher.

mod provider;

pub use provider::{
    Context, StaticContextProvider, WindowContextProvider, WindowError, WindowInfo, WindowMatcher, UNKNOWN_CONTEXT,
};

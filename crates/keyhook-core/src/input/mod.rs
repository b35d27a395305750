// Keyhook Input Layer
// Physical events as delivered by the OS hook

pub mod event;

pub use event::{KeyEvent, RawKeyEvent, Transition, UNTAGGED};

// Keyhook Engine State
// Per-engine mutable state: held modifiers and keys whose press fired a rule

pub mod keystore;
pub mod tracker;

pub use keystore::{HeldKey, Keystore};
pub use tracker::ModifierTracker;

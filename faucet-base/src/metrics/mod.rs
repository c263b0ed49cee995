//! Useful metrics that all agents should track.

pub use self::core::*;

/// The metrics namespace prefix. All metric names will start with `{NAMESPACE}_`.
pub const NAMESPACE: &str = "faucet";

mod core;

//! Game simulation modules

pub mod combat;
pub mod input;
pub mod physics;
pub mod snapshot;
pub mod tick;
pub mod world;

pub use world::{Outbound, Player, WorldState, WorldStore};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ws::protocol::IntentMsg;

/// Opaque session identifier, unique per connection lifetime
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters, for default display names and logs
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(6) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sanitized input for one intent message
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// Horizontal direction in [-1, 1]
    pub dx: f64,
    /// Vertical direction in [-1, 1]
    pub dy: f64,
    /// Aim direction in radians
    pub aim: f64,
    /// Fire trigger
    pub shoot: bool,
}

impl From<IntentMsg> for Intent {
    fn from(msg: IntentMsg) -> Self {
        Self {
            dx: finite_or_zero(msg.dx).clamp(-1.0, 1.0),
            dy: finite_or_zero(msg.dy).clamp(-1.0, 1.0),
            aim: finite_or_zero(msg.a),
            shoot: msg.shoot == 1.0,
        }
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

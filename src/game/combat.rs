//! Combat system - projectiles, cooldown, hit detection

use std::time::{Duration, Instant};

use crate::util::time::elapsed_at_least;

use super::physics::{PhysicsSystem, WorldBounds, PLAYER_SIZE};
use super::PlayerId;

/// Side length of a projectile's square hitbox
pub const BULLET_SIZE: f64 = 6.0;

/// Distance a projectile travels per tick
pub const BULLET_SPEED: f64 = 8.0;

/// Minimum wall-clock time between two shots of one player
pub const SHOT_COOLDOWN: Duration = Duration::from_secs(1);

/// Projectile in flight
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    /// Firing player; may no longer be connected
    pub owner: PlayerId,
}

impl Projectile {
    /// Fire a projectile from `(x, y)` along `angle` (radians)
    pub fn fire(owner: PlayerId, x: f64, y: f64, angle: f64) -> Self {
        Self {
            x,
            y,
            dx: angle.cos() * BULLET_SPEED,
            dy: angle.sin() * BULLET_SPEED,
            owner,
        }
    }

    /// Move by one tick of velocity
    pub fn advance(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
    }

    pub fn in_bounds(&self, bounds: &WorldBounds) -> bool {
        bounds.contains(self.x, self.y)
    }

    /// Check overlap with a player hitbox at `(x, y)`
    pub fn hits(&self, player_x: f64, player_y: f64) -> bool {
        PhysicsSystem::squares_overlap(
            self.x,
            self.y,
            BULLET_SIZE,
            player_x,
            player_y,
            PLAYER_SIZE,
        )
    }
}

/// Combat rules that do not belong to a single projectile
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire (cooldown check)
    pub fn can_fire(last_shot: Option<Instant>, now: Instant) -> bool {
        elapsed_at_least(last_shot, now, SHOT_COOLDOWN)
    }
}

/// Hit result from collision resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    /// Whether the shooter was still connected and got the kill
    pub credited: bool,
}

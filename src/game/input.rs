//! Applying joins and intents to the world

use std::time::Instant;

use super::combat::{CombatSystem, Projectile};
use super::physics::PhysicsSystem;
use super::world::{Outbound, Player, WorldState};
use super::{Intent, PlayerId};

/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 16;

/// What an intent changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentOutcome {
    pub moved: bool,
    pub fired: bool,
}

/// Clean up a client-supplied name, falling back to one derived from the id
pub fn sanitize_name(raw: Option<&str>, id: &PlayerId) -> String {
    let name: String = raw
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();

    let name = name.trim_end();
    if name.is_empty() {
        format!("player-{}", id.short())
    } else {
        name.to_string()
    }
}

/// Create a player at a random spawn point and register its connection
///
/// Returns `false` if the id is already in the world.
pub fn join(state: &mut WorldState, id: PlayerId, name: Option<&str>, outbound: Outbound) -> bool {
    let name = sanitize_name(name, &id);
    let (x, y) = state.random_spawn();
    state.add_player(Player::new(id, name, x, y), outbound)
}

/// Apply one intent: move, clamp, then fire if the cooldown allows
///
/// `None` when the player is gone, e.g. a trailing message after removal.
pub fn apply_intent(
    state: &mut WorldState,
    id: &PlayerId,
    intent: &Intent,
    now: Instant,
) -> Option<IntentOutcome> {
    let bounds = state.bounds();
    let player = state.player_mut(id)?;

    let (x, y) = PhysicsSystem::move_player(player.x, player.y, intent.dx, intent.dy, &bounds);
    let moved = (x, y) != (player.x, player.y);
    player.x = x;
    player.y = y;

    let shot = if intent.shoot && CombatSystem::can_fire(player.last_shot, now) {
        player.last_shot = Some(now);
        Some(Projectile::fire(id.clone(), x, y, intent.aim))
    } else {
        None
    };

    let fired = shot.is_some();
    if let Some(projectile) = shot {
        state.push_projectile(projectile);
    }

    Some(IntentOutcome { moved, fired })
}

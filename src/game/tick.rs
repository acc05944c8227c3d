//! Authoritative simulation step and the fixed-rate tick loop

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::util::time::tick_duration;

use super::combat::Hit;
use super::snapshot::{self, Fanout, SnapshotStats};
use super::{WorldState, WorldStore};

/// Emit aggregate snapshot stats every this many ticks
const STATS_INTERVAL_TICKS: u64 = 600;

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub hits: Vec<Hit>,
    /// Projectiles dropped for leaving the world or hitting someone
    pub pruned: usize,
    /// Whether every player was relocated this tick
    pub respawned: bool,
}

/// Advance the world by one tick
///
/// Order: advance projectiles, resolve hits against the advanced positions,
/// respawn everyone once if anything was hit, drop spent projectiles.
pub fn step(state: &mut WorldState) -> TickReport {
    let tick = state.begin_tick();

    for projectile in state.projectiles_mut() {
        projectile.advance();
    }

    // First non-owner player in id order takes the hit
    let mut consumed = vec![false; state.projectile_count()];
    let mut strikes = Vec::new();
    for (idx, projectile) in state.projectiles().iter().enumerate() {
        let target = state
            .players()
            .find(|p| p.id != projectile.owner && projectile.hits(p.x, p.y))
            .map(|p| p.id.clone());

        if let Some(target_id) = target {
            consumed[idx] = true;
            strikes.push((projectile.owner.clone(), target_id));
        }
    }

    let mut hits = Vec::with_capacity(strikes.len());
    for (shooter_id, target_id) in strikes {
        if let Some(victim) = state.player_mut(&target_id) {
            victim.deaths += 1;
        }

        let credited = match state.player_mut(&shooter_id) {
            Some(shooter) => {
                shooter.kills += 1;
                true
            }
            None => false,
        };

        hits.push(Hit {
            shooter_id,
            target_id,
            credited,
        });
    }

    let respawned = !hits.is_empty();
    if respawned {
        state.respawn_all();
    }

    let bounds = state.bounds();
    let before = state.projectile_count();
    let survivors = state
        .replace_projectiles(Vec::new())
        .into_iter()
        .zip(consumed)
        .filter(|(projectile, consumed)| !consumed && projectile.in_bounds(&bounds))
        .map(|(projectile, _)| projectile)
        .collect::<Vec<_>>();
    let pruned = before - survivors.len();
    state.replace_projectiles(survivors);

    TickReport {
        tick,
        hits,
        pruned,
        respawned,
    }
}

/// Run one tick and broadcast its snapshot inside a single critical section
pub fn tick_once(world: &WorldStore) -> (TickReport, Fanout, usize) {
    let mut state = world.lock();
    let report = step(&mut state);
    let fanout = snapshot::broadcast(&mut state);
    (report, fanout, state.player_count())
}

/// Run the free-running tick loop forever
pub async fn run_tick_loop(world: WorldStore, tick_rate: u32) {
    info!(tick_rate, "Tick loop started");

    let mut tick_interval = interval(tick_duration(tick_rate));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats = SnapshotStats::default();

    loop {
        tick_interval.tick().await;

        let (report, fanout, player_count) = tick_once(&world);

        for hit in &report.hits {
            info!(
                tick = report.tick,
                shooter_id = %hit.shooter_id,
                target_id = %hit.target_id,
                credited = hit.credited,
                "Player hit"
            );
        }
        if report.respawned {
            info!(tick = report.tick, players = player_count, "Respawned all players");
        }
        for id in &fanout.reaped {
            info!(player_id = %id, "Reaped connection after failed send");
        }
        trace!(
            tick = report.tick,
            pruned = report.pruned,
            delivered = fanout.delivered,
            skipped = fanout.skipped,
            bytes = fanout.bytes,
            "Tick complete"
        );

        stats.record(player_count, fanout.bytes);
        if report.tick % STATS_INTERVAL_TICKS == 0 {
            debug!(
                snapshots = stats.total_snapshots,
                total_bytes = stats.total_bytes,
                avg_players = stats.avg_players_per_snapshot,
                "Snapshot stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::{Projectile, BULLET_SPEED};
    use crate::game::physics::{WorldBounds, PLAYER_SIZE};
    use crate::game::{Player, PlayerId};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn state() -> WorldState {
        WorldState::new(WorldBounds::default(), Some(11))
    }

    fn add(state: &mut WorldState, id: &str, x: f64, y: f64) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(8);
        state.add_player(Player::new(PlayerId::from(id), id.into(), x, y), tx);
        rx
    }

    fn pos(state: &WorldState, id: &str) -> (f64, f64) {
        let p = state.player(&PlayerId::from(id)).unwrap();
        (p.x, p.y)
    }

    #[test]
    fn projectiles_advance_linearly_until_out_of_bounds() {
        let mut state = state();
        state.push_projectile(Projectile::fire(PlayerId::from("x"), 400.0, 300.0, 0.0));
        state.push_projectile(Projectile::fire(PlayerId::from("x"), 20.0, 300.0, std::f64::consts::PI));

        for n in 1..=2 {
            let report = step(&mut state);
            assert_eq!(report.pruned, 0);
            let b = &state.projectiles()[0];
            assert!((b.x - (400.0 + n as f64 * BULLET_SPEED)).abs() < 1e-9);
            assert_eq!(b.y, 300.0);
        }

        // second one is at x = 4 after two ticks, gone after the third
        let report = step(&mut state);
        assert_eq!(report.pruned, 1);
        assert_eq!(state.projectile_count(), 1);
        assert!((state.projectiles()[0].x - 424.0).abs() < 1e-9);
    }

    #[test]
    fn hit_scores_respawns_and_consumes() {
        let mut state = state();
        let _b = add(&mut state, "b", 100.0, 100.0);
        let _c = add(&mut state, "c", 200.0, 100.0);
        // reaches C's left edge this tick
        state.push_projectile(Projectile::fire(PlayerId::from("b"), 190.0, 105.0, 0.0));

        let report = step(&mut state);
        assert_eq!(
            report.hits,
            vec![Hit {
                shooter_id: PlayerId::from("b"),
                target_id: PlayerId::from("c"),
                credited: true,
            }]
        );
        assert!(report.respawned);
        assert_eq!(report.pruned, 1);
        assert_eq!(state.projectile_count(), 0);

        let c = state.player(&PlayerId::from("c")).unwrap();
        assert_eq!((c.deaths, c.kills), (1, 0));
        let b = state.player(&PlayerId::from("b")).unwrap();
        assert_eq!((b.deaths, b.kills), (0, 1));

        let bounds = state.bounds();
        for p in state.players() {
            assert!(p.x >= 0.0 && p.x <= bounds.width - PLAYER_SIZE);
            assert!(p.y >= 0.0 && p.y <= bounds.height - PLAYER_SIZE);
        }
    }

    #[test]
    fn global_respawn_moves_bystanders() {
        let mut state = state();
        let _b = add(&mut state, "b", 100.0, 100.0);
        let _c = add(&mut state, "c", 200.0, 100.0);
        let _d = add(&mut state, "d", 500.0, 500.0);
        state.push_projectile(Projectile::fire(PlayerId::from("b"), 195.0, 105.0, 0.0));

        step(&mut state);
        assert_ne!(pos(&state, "b"), (100.0, 100.0));
        assert_ne!(pos(&state, "d"), (500.0, 500.0));
        assert_eq!(state.player(&PlayerId::from("d")).unwrap().deaths, 0);
    }

    #[test]
    fn never_hits_owner() {
        let mut state = state();
        let _a = add(&mut state, "a", 100.0, 100.0);
        state.push_projectile(Projectile::fire(PlayerId::from("a"), 100.0, 100.0, 0.0));

        let report = step(&mut state);
        assert!(report.hits.is_empty());
        assert!(!report.respawned);
        assert_eq!(pos(&state, "a"), (100.0, 100.0));
        assert_eq!(state.projectile_count(), 1);
    }

    #[test]
    fn orphaned_projectile_hits_without_credit() {
        let mut state = state();
        let _a = add(&mut state, "a", 100.0, 100.0);
        let _v = add(&mut state, "v", 300.0, 100.0);
        state.push_projectile(Projectile::fire(PlayerId::from("a"), 290.0, 105.0, 0.0));
        state.remove_player(&PlayerId::from("a"));

        let report = step(&mut state);
        assert_eq!(report.hits.len(), 1);
        assert!(!report.hits[0].credited);
        assert_eq!(state.player(&PlayerId::from("v")).unwrap().deaths, 1);
    }

    #[test]
    fn orphaned_projectile_survives_without_targets() {
        let mut state = state();
        let _a = add(&mut state, "a", 100.0, 100.0);
        state.push_projectile(Projectile::fire(PlayerId::from("a"), 400.0, 300.0, 0.0));
        state.remove_player(&PlayerId::from("a"));

        step(&mut state);
        assert_eq!(state.projectile_count(), 1);
        assert_eq!(state.projectiles()[0].owner, PlayerId::from("a"));
    }

    #[test]
    fn each_projectile_hits_at_most_once() {
        let mut state = state();
        let _s = add(&mut state, "s", 700.0, 500.0);
        let _a = add(&mut state, "a", 100.0, 100.0);
        let _b = add(&mut state, "b", 100.0, 100.0);
        state.push_projectile(Projectile::fire(PlayerId::from("s"), 102.0, 105.0, 0.0));

        let report = step(&mut state);
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].target_id, PlayerId::from("a"));
        let s = state.player(&PlayerId::from("s")).unwrap();
        assert_eq!(s.kills, 1);
    }

    #[test]
    fn survivors_keep_order() {
        let mut state = state();
        for (i, x) in [100.0, 795.0, 300.0, 500.0].into_iter().enumerate() {
            let owner = PlayerId::from(format!("o{i}").as_str());
            state.push_projectile(Projectile::fire(owner, x, 300.0, 0.0));
        }

        step(&mut state);
        let owners: Vec<_> = state.projectiles().iter().map(|b| b.owner.as_str()).collect();
        assert_eq!(owners, vec!["o0", "o2", "o3"]);
    }

    #[test]
    fn tick_once_broadcasts_post_step_state() {
        let world = WorldStore::new(WorldBounds::default(), Some(5));
        let mut rx = {
            let mut state = world.lock();
            let rx = add(&mut state, "a", 50.0, 50.0);
            state.push_projectile(Projectile::fire(PlayerId::from("a"), 795.0, 10.0, 0.0));
            rx
        };

        let (report, fanout, players) = tick_once(&world);
        assert_eq!(report.tick, 1);
        assert_eq!(report.pruned, 1);
        assert_eq!(fanout.delivered, 1);
        assert_eq!(players, 1);

        let frame = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["b"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["p"]["a"]["x"], 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_at_fixed_rate() {
        let world = WorldStore::new(WorldBounds::default(), Some(5));
        let handle = tokio::spawn(run_tick_loop(world.clone(), 60));

        tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
        let ticks = world.lock().tick();
        handle.abort();

        assert!((59..=61).contains(&ticks), "ticks = {ticks}");
    }
}

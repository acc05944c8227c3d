//! World state store: the single lock domain for all simulation state

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;

use super::combat::Projectile;
use super::physics::WorldBounds;
use super::PlayerId;

/// Per-connection queue of serialized server messages
pub type Outbound = mpsc::Sender<Arc<str>>;

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,

    /// Top-left corner of the hitbox
    pub x: f64,
    pub y: f64,

    /// `None` until the first accepted shot
    pub last_shot: Option<Instant>,

    pub kills: u32,
    pub deaths: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, x: f64, y: f64) -> Self {
        Self {
            id,
            name,
            x,
            y,
            last_shot: None,
            kills: 0,
            deaths: 0,
        }
    }
}

/// Everything the simulation mutates. Only reachable through [`WorldStore::lock`].
pub struct WorldState {
    tick: u64,
    bounds: WorldBounds,
    // Ordered so collision checks and snapshots are deterministic
    players: BTreeMap<PlayerId, Player>,
    projectiles: Vec<Projectile>,
    connections: HashMap<PlayerId, Outbound>,
    rng: ChaCha8Rng,
}

impl WorldState {
    pub fn new(bounds: WorldBounds, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            tick: 0,
            bounds,
            players: BTreeMap::new(),
            projectiles: Vec::new(),
            connections: HashMap::new(),
            rng,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Bump and return the tick counter
    pub fn begin_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Register a player together with its connection handle
    ///
    /// Returns `false` without touching anything if the id is taken.
    pub fn add_player(&mut self, mut player: Player, outbound: Outbound) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }

        (player.x, player.y) = self.bounds.clamp_player(player.x, player.y);
        self.connections.insert(player.id.clone(), outbound);
        self.players.insert(player.id.clone(), player);
        true
    }

    /// Drop a player and its connection handle. Idempotent.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        self.connections.remove(id);
        self.players.remove(id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Players in ascending id order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn push_projectile(&mut self, projectile: Projectile) {
        self.projectiles.push(projectile);
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn projectiles_mut(&mut self) -> &mut [Projectile] {
        &mut self.projectiles
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Swap in a new projectile collection, returning the previous one
    pub fn replace_projectiles(&mut self, projectiles: Vec<Projectile>) -> Vec<Projectile> {
        std::mem::replace(&mut self.projectiles, projectiles)
    }

    pub fn connections(&self) -> impl Iterator<Item = (&PlayerId, &Outbound)> {
        self.connections.iter()
    }

    /// Uniformly random position that keeps a player fully in bounds
    pub fn random_spawn(&mut self) -> (f64, f64) {
        let x = self.rng.gen_range(0.0..=self.bounds.max_player_x());
        let y = self.rng.gen_range(0.0..=self.bounds.max_player_y());
        (x, y)
    }

    /// Relocate every connected player to a fresh random position
    pub fn respawn_all(&mut self) {
        let max_x = self.bounds.max_player_x();
        let max_y = self.bounds.max_player_y();
        for player in self.players.values_mut() {
            player.x = self.rng.gen_range(0.0..=max_x);
            player.y = self.rng.gen_range(0.0..=max_y);
        }
    }
}

/// Shared handle to the world. Cloning shares the same state.
#[derive(Clone)]
pub struct WorldStore {
    inner: Arc<Mutex<WorldState>>,
}

impl WorldStore {
    pub fn new(bounds: WorldBounds, seed: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WorldState::new(bounds, seed))),
        }
    }

    /// Enter the critical section; released when the guard drops.
    ///
    /// Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.inner.lock()
    }
}

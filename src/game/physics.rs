//! Player movement and world bounds

/// Side length of a player's square hitbox
pub const PLAYER_SIZE: f64 = 20.0;

/// Distance moved per unit of input direction per intent
pub const MOVE_SPEED: f64 = 5.0;

/// Rectangular playable area anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f64,
    pub height: f64,
}

impl WorldBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Largest x a player's top-left corner may take
    pub fn max_player_x(&self) -> f64 {
        (self.width - PLAYER_SIZE).max(0.0)
    }

    /// Largest y a player's top-left corner may take
    pub fn max_player_y(&self) -> f64 {
        (self.height - PLAYER_SIZE).max(0.0)
    }

    /// Clamp a player position so the whole hitbox stays inside the world
    pub fn clamp_player(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(0.0, self.max_player_x()),
            y.clamp(0.0, self.max_player_y()),
        )
    }

    /// Whether a point lies inside the world, edges included
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Physics system for player movement and hitbox tests
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Apply one movement intent and clamp to the world
    ///
    /// Diagonals are not normalized: `(1, 1)` covers more ground than `(1, 0)`.
    pub fn move_player(x: f64, y: f64, dx: f64, dy: f64, bounds: &WorldBounds) -> (f64, f64) {
        bounds.clamp_player(x + dx * MOVE_SPEED, y + dy * MOVE_SPEED)
    }

    /// Strict overlap of two axis-aligned squares given by top-left corner and size
    ///
    /// Touching edges do not count as a hit.
    pub fn squares_overlap(ax: f64, ay: f64, a_size: f64, bx: f64, by: f64, b_size: f64) -> bool {
        ax + a_size > bx && ax < bx + b_size && ay + a_size > by && ay < by + b_size
    }
}

//! Time utilities for the simulation clock

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Upper bound accepted from configuration
pub const MAX_TICK_RATE: u32 = 240;

/// Wall-clock length of one tick at the given rate
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)))
}

/// Whether at least `cooldown` has passed since `last`
///
/// `None` means the event never happened, so the gate is open.
pub fn elapsed_at_least(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    match last {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= cooldown,
    }
}

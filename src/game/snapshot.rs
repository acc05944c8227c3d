//! Snapshot building and fan-out

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error};

use crate::ws::protocol::{PlayerView, ProjectileView, ServerMsg, Snapshot};

use super::{PlayerId, WorldState};

/// Project the current world into a wire snapshot
pub fn build(state: &WorldState) -> Snapshot<'_> {
    Snapshot {
        p: state
            .players()
            .map(|p| {
                (
                    &p.id,
                    PlayerView {
                        x: p.x,
                        y: p.y,
                        name: &p.name,
                        kills: p.kills,
                        deaths: p.deaths,
                    },
                )
            })
            .collect(),
        b: state
            .projectiles()
            .iter()
            .map(|b| ProjectileView {
                x: b.x,
                y: b.y,
                dx: b.dx,
                dy: b.dy,
                o: &b.owner,
            })
            .collect(),
    }
}

/// Outcome of one fan-out
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fanout {
    /// Serialized snapshot size
    pub bytes: usize,
    pub delivered: usize,
    /// Connections whose queue was full; they miss this snapshot only
    pub skipped: usize,
    /// Connections found closed and removed from the world
    pub reaped: Vec<PlayerId>,
}

/// Serialize the snapshot once and queue it on every connection
///
/// Never blocks. Closed connections are removed through the same path as a
/// read failure.
pub fn broadcast(state: &mut WorldState) -> Fanout {
    let frame: Arc<str> = match serde_json::to_string(&ServerMsg::Snapshot(build(state))) {
        Ok(json) => json.into(),
        Err(e) => {
            error!(error = %e, "Failed to serialize snapshot");
            return Fanout::default();
        }
    };

    let mut fanout = Fanout {
        bytes: frame.len(),
        ..Fanout::default()
    };

    for (id, outbound) in state.connections() {
        match outbound.try_send(frame.clone()) {
            Ok(()) => fanout.delivered += 1,
            Err(TrySendError::Full(_)) => {
                debug!(player_id = %id, "Outbound queue full, dropping snapshot");
                fanout.skipped += 1;
            }
            Err(TrySendError::Closed(_)) => fanout.reaped.push(id.clone()),
        }
    }

    for id in &fanout.reaped {
        state.remove_player(id);
    }

    fanout
}

/// Running totals for periodic logging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }
}

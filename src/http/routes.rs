//! HTTP route definitions

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick_rate: u32,
    tick: u64,
    players: usize,
    projectiles: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (tick, players, projectiles) = {
        let world = state.world.lock();
        (world.tick(), world.player_count(), world.projectile_count())
    };

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tick_rate: state.config.tick_rate,
        tick,
        players,
        projectiles,
    })
}

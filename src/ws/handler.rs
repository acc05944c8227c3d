//! WebSocket upgrade handler and per-connection session

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, Stream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::game::input::{apply_intent, join};
use crate::game::{Intent, Outbound, PlayerId, WorldStore};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Messages buffered per connection before snapshots start being dropped
pub const OUTBOUND_BUFFER: usize = 8;

/// Why a session ended. Always terminal for that one connection only.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connection closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unexpected binary frame")]
    UnexpectedBinary,
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.world))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, world: WorldStore) {
    let id = PlayerId::generate();
    info!(player_id = %id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    // Writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(write_loop(id.clone(), ws_sink, outbound_rx));

    let reason = run_session(&world, &id, ws_stream, outbound_tx).await;

    // Cleanup on disconnect
    let removed = world.lock().remove_player(&id).is_some();
    writer_handle.abort();

    match reason {
        SessionError::Closed => {
            info!(player_id = %id, removed, "WebSocket connection closed");
        }
        e => {
            warn!(player_id = %id, removed, error = %e, "WebSocket session ended");
        }
    }
}

/// Reader loop: decode each frame and apply it to the world right away
///
/// The player is created on the first well-formed message. Returns the
/// reason the loop stopped; removing the player is left to the caller.
pub async fn run_session<S>(
    world: &WorldStore,
    id: &PlayerId,
    mut stream: S,
    outbound: Outbound,
) -> SessionError
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Moved into the world on join
    let mut pending = Some(outbound);

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => return SessionError::UnexpectedBinary,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => return SessionError::Closed,
            Err(e) => return SessionError::Transport(e),
        };

        let msg = match serde_json::from_str::<ClientMsg>(&text) {
            Ok(msg) => msg,
            Err(e) => return SessionError::Malformed(e),
        };

        match msg {
            ClientMsg::Join { name } => match pending.take() {
                Some(outbound) => admit(world, id, Some(&name), outbound),
                None => debug!(player_id = %id, "Ignoring repeated join"),
            },
            ClientMsg::Intent(raw) => {
                if let Some(outbound) = pending.take() {
                    admit(world, id, None, outbound);
                }

                let intent = Intent::from(raw);
                let outcome = {
                    let mut state = world.lock();
                    apply_intent(&mut state, id, &intent, Instant::now())
                };

                if outcome.is_some_and(|o| o.fired) {
                    debug!(player_id = %id, aim = intent.aim, "Shot fired");
                }
            }
        }
    }

    SessionError::Closed
}

/// Announce the id to the client and put the player into the world
fn admit(world: &WorldStore, id: &PlayerId, name: Option<&str>, outbound: Outbound) {
    // Queued before registration so the id precedes every snapshot
    match serde_json::to_string(&ServerMsg::Welcome { id }) {
        Ok(welcome) => {
            if outbound.try_send(welcome.into()).is_err() {
                debug!(player_id = %id, "Could not queue welcome");
            }
        }
        Err(e) => warn!(player_id = %id, error = %e, "Failed to serialize welcome"),
    }

    let joined_as = {
        let mut state = world.lock();
        if join(&mut state, id.clone(), name, outbound) {
            state.player(id).map(|p| p.name.clone())
        } else {
            None
        }
    };

    match joined_as {
        Some(name) => info!(player_id = %id, name = %name, "Player joined"),
        None => warn!(player_id = %id, "Player already in world"),
    }
}

/// Drain the outbound queue into the socket, in order
async fn write_loop(
    id: PlayerId,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Arc<str>>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
            // Dropping the receiver makes the next broadcast reap this player
            debug!(player_id = %id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

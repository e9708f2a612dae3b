//! `WebSocket` handler hosting one live map view per connection.
//!
//! Clients connect to `GET /ws/view?location=<key>` and the server mounts
//! a [`ViewEngine`] over a [`CommandBackend`]. Every map operation the
//! engine performs is forwarded as a [`ServerFrame::Command`]; every
//! status change as a [`ServerFrame::Status`]. The client sends
//! [`ClientFrame`]s to switch location or filter.
//!
//! Closing the socket tears the view down. Any fetch still in flight is
//! aborted, so nothing reaches the client after the close.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vibemap_core::backend::CommandBackend;
use vibemap_core::session::{ViewCommand, ViewSession};
use vibemap_core::view::ViewEngine;
use vibemap_types::{ClientFrame, ServerFrame};

use crate::state::AppState;

/// Capacity of the per-view command queue.
const COMMAND_QUEUE: usize = 32;

/// Query parameters for the `GET /ws/view` endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct WsQuery {
    /// Location to show first; defaults to the configured default location.
    pub location: Option<String>,
}

/// Upgrade an HTTP request to a `WebSocket` connection and mount a view.
///
/// # Route
///
/// `GET /ws/view`
pub async fn ws_view(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let location = query
        .location
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state.config.places.default_location.clone());
    ws.on_upgrade(move |socket| handle_view(socket, state, location))
}

/// Map a client frame to the command it stands for.
fn command_for(frame: ClientFrame) -> ViewCommand {
    match frame {
        ClientFrame::SetLocation { location } => ViewCommand::SetLocation(location),
        ClientFrame::SetFilter { filter } => ViewCommand::SetFilter(filter),
    }
}

/// Serialize and send one frame. Returns `false` once the client is gone.
async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize server frame: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the view lifecycle: run the session, pump its output to the
/// socket, and feed client frames back in until either side stops.
async fn handle_view(mut socket: WebSocket, state: Arc<AppState>, location: String) {
    let (backend, mut map_rx) = CommandBackend::channel();
    let engine = ViewEngine::new(backend, &state.config.map, state.config.markers.clone());
    let view = engine.id();
    info!(%view, %location, "WebSocket view mounted");

    let (session, mut status_rx) = ViewSession::new(engine, state.source.clone(), state.script());
    let (commands, commands_rx) = mpsc::channel(COMMAND_QUEUE);
    let task = tokio::spawn(session.run(commands_rx));

    if commands.send(ViewCommand::SetLocation(location)).await.is_err() {
        warn!(%view, "view session ended before the first location");
    }

    let initial = ServerFrame::Status(status_rx.borrow_and_update().clone());
    let mut open = send_frame(&mut socket, &initial).await;
    let mut status_open = true;

    while open {
        tokio::select! {
            Some(command) = map_rx.recv() => {
                open = send_frame(&mut socket, &ServerFrame::Command(command)).await;
            }
            changed = status_rx.changed(), if status_open => {
                if changed.is_ok() {
                    let status = status_rx.borrow_and_update().clone();
                    open = send_frame(&mut socket, &ServerFrame::Status(status)).await;
                } else {
                    status_open = false;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(text.as_str()) {
                            Ok(frame) => {
                                debug!(%view, ?frame, "client frame");
                                if commands.send(command_for(frame)).await.is_err() {
                                    open = false;
                                }
                            }
                            Err(e) => debug!(%view, "Ignoring malformed client frame: {e}"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        open = socket.send(Message::Pong(data)).await.is_ok();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%view, "WebSocket client disconnected");
                        open = false;
                    }
                    Some(Err(e)) => {
                        debug!(%view, "WebSocket error: {e}");
                        open = false;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if commands.send(ViewCommand::Teardown).await.is_err() {
        debug!(%view, "view session already ended before teardown");
    }
    match task.await {
        Ok(engine) => info!(
            %view,
            live_markers = engine.surface().backend().live_markers(),
            "WebSocket view torn down"
        ),
        Err(e) => warn!(%view, error = %e, "view session task failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vibemap_types::FilterState;

    use super::*;

    #[test]
    fn client_frames_map_to_view_commands() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"set_location","location":"Austin, TX"}"#).unwrap();
        assert_eq!(
            command_for(frame),
            ViewCommand::SetLocation(String::from("Austin, TX"))
        );

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"set_filter","filter":"ALL"}"#).unwrap();
        assert_eq!(command_for(frame), ViewCommand::SetFilter(FilterState::All));
    }
}

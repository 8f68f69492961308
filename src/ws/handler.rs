//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{SessionEvent, SessionMessage};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Refuse at admission when the world is full. The world task re-checks
    // on registration; this keeps full servers from paying for an upgrade.
    if state.world.player_count() >= state.config.max_players {
        warn!(
            max_players = state.config.max_players,
            "Refusing WebSocket upgrade at capacity"
        );
        return Response::builder()
            .status(503)
            .body("Server full".into())
            .unwrap();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        return;
    }

    // Register the unicast channel before the world knows about us so a
    // capacity refusal has somewhere to land
    let (unicast_tx, unicast_rx) = mpsc::unbounded_channel();
    state.connections.insert(player_id, unicast_tx);

    let broadcast_rx = state.world.subscribe();
    let input_tx = state.world.input_tx.clone();

    if input_tx
        .send(SessionMessage {
            player_id,
            event: SessionEvent::Connected,
            received_at: unix_millis(),
        })
        .await
        .is_err()
    {
        error!(player_id = %player_id, "World task is gone");
        state.connections.remove(player_id);
        return;
    }

    run_session(player_id, ws_sink, ws_stream, &input_tx, broadcast_rx, unicast_rx).await;

    // Cleanup on disconnect
    let _ = input_tx
        .send(SessionMessage {
            player_id,
            event: SessionEvent::Disconnected,
            received_at: unix_millis(),
        })
        .await;
    state.connections.remove(player_id);

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: &mpsc::Sender<SessionMessage>,
    mut broadcast_rx: broadcast::Receiver<ServerMsg>,
    mut unicast_rx: mpsc::UnboundedReceiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: world broadcasts + unicast messages -> WebSocket
    let writer_player_id = player_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                broadcast = broadcast_rx.recv() => match broadcast {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            player_id = %writer_player_id,
                            lagged_count = n,
                            "Client lagged, skipping {} messages", n
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(player_id = %writer_player_id, "Broadcast channel closed");
                        break;
                    }
                },
                unicast = unicast_rx.recv() => match unicast {
                    Some(msg) => msg,
                    None => {
                        debug!(player_id = %writer_player_id, "Unicast channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %writer_player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> world task
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_message() {
                    warn!(player_id = %player_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        let msg = SessionMessage {
                            player_id,
                            event: SessionEvent::Message(client_msg),
                            received_at: unix_millis(),
                        };

                        if input_tx.send(msg).await.is_err() {
                            debug!(player_id = %player_id, "Input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(player_id = %player_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(player_id = %player_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

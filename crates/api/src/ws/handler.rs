use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde_json::json;

use imgconv_events::session_channel;

use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade a fresh session id is minted, announced to the
/// client as the first frame, and subscribed to its status channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket session after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the session with `WsManager`.
///   2. Sends the `session_id` frame so the client can tag submissions.
///   3. Spawns a relay task forwarding status events and manager messages.
///   4. Processes inbound messages on the current task.
///   5. Tears down subscription and registration on every exit path.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(session_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // First frame: the session id this connection is subscribed under.
    let hello = json!({ "type": "session_id", "session_id": session_id }).to_string();
    if sink.send(Message::Text(hello.into())).await.is_err() {
        state.ws_manager.remove(&session_id).await;
        return;
    }

    let mut subscription = match state.subscriber.subscribe(&session_channel(&session_id)).await {
        Ok(subscription) => subscription,
        Err(error) => {
            tracing::warn!(session_id = %session_id, %error, "Status channel subscribe failed");
            state.ws_manager.remove(&session_id).await;
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    // Relay task: forward status events and manager messages to the sink,
    // preserving publish order within the subscription.
    let relay_session = session_id.clone();
    let mut relay_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = subscription.next() => {
                    let Some(event) = event else { break };
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(error) => {
                            tracing::warn!(session_id = %relay_session, %error, "Unserializable status event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        tracing::debug!(session_id = %relay_session, "WebSocket sink closed");
                        break;
                    }
                }
                message = rx.recv() => {
                    let Some(message) = message else { break };
                    let closing = matches!(message, Message::Close(_));
                    if sink.send(message).await.is_err() || closing {
                        break;
                    }
                }
            }
        }
    });

    // Inbound loop: clients only listen on this socket; everything but
    // Close is ignored. Also watch the relay task so a session whose
    // event source or sink died is torn down without waiting on the
    // client.
    loop {
        tokio::select! {
            result = stream.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::debug!(session_id = %session_id, %error, "WebSocket receive error");
                        break;
                    }
                }
            }
            _ = &mut relay_task => {
                tracing::debug!(session_id = %session_id, "Relay ended, closing session");
                break;
            }
        }
    }

    // Clean up: dropping the relay task drops the subscription, which
    // unsubscribes the session channel.
    state.ws_manager.remove(&session_id).await;
    relay_task.abort();
    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}

//! Observer WebSocket handler
//!
//! Each upgraded connection becomes one observer session. The socket's write
//! half carries deltas; the read half only watches for the peer going away.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, stream::SplitStream, SinkExt, StreamExt};
use pixelboard_canvas::{DeltaSink, Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::server::AppState;

/// WebSocket upgrade handler
pub async fn observer_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Write half of a viewer socket
struct WebSocketSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl DeltaSink for WebSocketSink {
    async fn send(&mut self, payload: String) -> Result<()> {
        self.0
            .send(Message::Text(payload))
            .await
            .map_err(|e| Error::transport(e.to_string()))
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("Observer connected");

    let (sender, receiver) = socket.split();
    let closed = state.shutdown.child_token();

    let reader = tokio::spawn(watch_for_close(receiver, closed.clone()));

    let end = state
        .board
        .observer()
        .run(WebSocketSink(sender), closed)
        .await;

    reader.abort();
    info!(reason = ?end, "Observer disconnected");
}

/// Drain incoming frames until the peer closes, then cancel `closed`
async fn watch_for_close(mut receiver: SplitStream<WebSocket>, closed: CancellationToken) {
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Observer closed connection");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                // Viewers have nothing to say; pings are answered by the socket
                Some(Ok(_)) => {}
            },
            _ = closed.cancelled() => break,
        }
    }
    closed.cancel();
}

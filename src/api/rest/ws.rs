use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info, warn};

use crate::models::event::DeskEvent;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket: WebSocket| async move {
        let (sink, stream) = socket.split();
        desk_feed(state, sink, stream).await;
    })
}

/// Streams desk events to one dashboard until either side goes away.
async fn desk_feed<Si, St, E>(state: Arc<AppState>, sink: Si, stream: St)
where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: Display + Send,
    St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
{
    let events = state.events_tx.subscribe();
    info!("desk feed client connected");

    let mut push = tokio::spawn(push_events(events, sink));
    let mut drain = tokio::spawn(drain_client(stream));

    // Whichever side finishes first takes the other down with it.
    tokio::select! {
        _ = &mut push => {
            drain.abort();
            let _ = drain.await;
        }
        _ = &mut drain => {
            push.abort();
            let _ = push.await;
        }
    }

    info!("desk feed client disconnected");
}

async fn push_events<Si>(mut events: Receiver<DeskEvent>, mut sink: Si)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "desk feed client lagging; events dropped");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        let frame = match serde_json::to_string(&event) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "desk event could not be encoded");
                continue;
            }
        };

        if let Err(err) = sink.send(Message::Text(frame.into())).await {
            debug!(error = %err, "desk feed send failed");
            return;
        }
    }
}

/// Inbound frames carry nothing; reading them notices the close.
async fn drain_client<St, E>(mut stream: St)
where
    St: Stream<Item = Result<Message, E>> + Unpin,
{
    while let Some(Ok(message)) = stream.next().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}

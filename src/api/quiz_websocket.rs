use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::game::{ErrorMessage, Flow, Handshake, RoomRegistry, Session};

/// How long queued frames get to reach the client once the session is over
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle_quiz_websocket(websocket: WebSocket, registry: Arc<RoomRegistry>) {
    tracing::info!("New quiz WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Spawn task to send messages to client; a close frame ends it
    let mut sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = message.is_close();
            if let Err(e) = ws_sender.send(message).await {
                tracing::debug!(error = %e, "Failed to send WebSocket message");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let handshake = match read_handshake(&mut ws_receiver).await {
        Some(handshake) => handshake,
        None => {
            reject(&tx, "Invalid initial message");
            drop(tx);
            drain_writer(&mut sender_task).await;
            return;
        }
    };

    let mut session = match Session::connect(registry, handshake.clone(), tx.clone()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(
                room_code = %handshake.room_code,
                username = %handshake.username,
                error = %e,
                "Rejected WebSocket join"
            );
            reject(&tx, &e.to_string());
            drop(tx);
            drain_writer(&mut sender_task).await;
            return;
        }
    };
    let mut writer_done = false;
    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(message)) => {
                    if message.is_close() {
                        break;
                    }
                    if let Ok(text) = message.to_str() {
                        if session.handle_text(text).await == Flow::Terminate {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(
                        room_code = %session.room().code(),
                        error = %e,
                        "WebSocket error"
                    );
                    break;
                }
                None => break,
            },
            _ = &mut sender_task => {
                writer_done = true;
                break;
            }
        }
    }

    session.disconnect().await;
    if !writer_done {
        let _ = tx.send(Message::close());
        drop(tx);
        drain_writer(&mut sender_task).await;
    }
    tracing::info!("Quiz WebSocket connection closed");
}

/// Wait for the first text frame and decode it as a handshake
async fn read_handshake(ws_receiver: &mut SplitStream<WebSocket>) -> Option<Handshake> {
    while let Some(frame) = ws_receiver.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket error before handshake");
                return None;
            }
        };

        if message.is_ping() || message.is_pong() {
            continue;
        }
        if message.is_close() {
            return None;
        }

        let text = message.to_str().ok()?;
        return match serde_json::from_str::<Handshake>(text) {
            Ok(handshake) => Some(handshake),
            Err(e) => {
                tracing::warn!(error = %e, raw_message = %text, "Failed to parse initial message");
                None
            }
        };
    }
    None
}

/// Report an error to a connection that never joined, then close it
fn reject(tx: &mpsc::UnboundedSender<Message>, error: &str) {
    match ErrorMessage::new(error).to_message() {
        Ok(message) => {
            let _ = tx.send(message);
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode error message"),
    }
    let _ = tx.send(Message::close());
}

async fn drain_writer(sender_task: &mut tokio::task::JoinHandle<()>) {
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut *sender_task)
        .await
        .is_err()
    {
        tracing::debug!("WebSocket writer did not finish in time");
        sender_task.abort();
    }
}

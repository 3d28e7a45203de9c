use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{push::TimerPush, ws::ViewerInboundMessage},
    services::authority::{self, AuthorityCommand},
    state::SharedState,
};

/// Internal error type for viewer socket operations.
///
/// Distinct from `ServiceError`, which is used for HTTP responses.
#[derive(Debug, Error)]
enum ViewerError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle for an individual viewer WebSocket connection.
pub async fn handle_socket(state: SharedState, session_id: Uuid, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps pushes flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Subscribe to the hub before taking the snapshot so a transition landing
    // between the two is never missed. Seeing it twice is harmless; every
    // push is self-contained.
    let Some((commands, mut pushes)) = state
        .sessions()
        .get(&session_id)
        .map(|session| (session.commands.clone(), session.hub.subscribe()))
    else {
        warn!(session = %session_id, "viewer subscribe to unknown session");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let viewer_id = Uuid::new_v4();

    let snapshot = match authority::query_snapshot(&commands).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(session = %session_id, error = %err, "timer authority unreachable during subscribe");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };
    if send_message_to_websocket(&outbound_tx, &TimerPush::state(snapshot)).is_err() {
        finalize(writer_task, outbound_tx).await;
        return;
    }

    info!(session = %session_id, viewer = %viewer_id, "viewer subscribed");

    loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Ok(push) => {
                    if send_message_to_websocket(&outbound_tx, &push).is_err() {
                        info!(session = %session_id, viewer = %viewer_id, "writer closed, terminating");
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // A fresh snapshot carries everything, so a lagging
                    // viewer recovers without replaying what it missed.
                    warn!(session = %session_id, viewer = %viewer_id, missed, "viewer lagged, resending snapshot");
                    match authority::query_snapshot(&commands).await {
                        Ok(snapshot) => {
                            if send_message_to_websocket(&outbound_tx, &TimerPush::state(snapshot))
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                Err(RecvError::Closed) => {
                    info!(session = %session_id, viewer = %viewer_id, "session closed, dropping viewer");
                    let _ = outbound_tx.send(Message::Close(None));
                    break;
                }
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    info!(session = %session_id, viewer = %viewer_id, payload = %text, "received viewer message");
                    handle_viewer_message(&commands, session_id, viewer_id, &text).await;
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(session = %session_id, viewer = %viewer_id, "viewer closed");
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Some(Ok(Message::Binary(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Err(err)) => {
                    warn!(session = %session_id, viewer = %viewer_id, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
        }
    }

    info!(session = %session_id, viewer = %viewer_id, "viewer disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Dispatch one raw viewer frame to the session's authority.
///
/// Send failures are deliberately ignored: if the authority is gone the push
/// channel closes right after, which ends the socket loop anyway.
async fn handle_viewer_message(
    commands: &mpsc::Sender<AuthorityCommand>,
    session_id: Uuid,
    viewer_id: Uuid,
    text: &str,
) {
    match ViewerInboundMessage::from_json_str(text) {
        Ok(ViewerInboundMessage::RequestTimerSync) => {
            let _ = commands
                .send(AuthorityCommand::RequestSync { viewer: viewer_id })
                .await;
        }
        Ok(ViewerInboundMessage::TimerClientExpired) => {
            let _ = commands
                .send(AuthorityCommand::ClientExpired { viewer: viewer_id })
                .await;
        }
        Ok(ViewerInboundMessage::Unknown) => {
            debug!(session = %session_id, viewer = %viewer_id, "ignoring unknown viewer message");
        }
        Err(err) => {
            warn!(session = %session_id, viewer = %viewer_id, error = %err, "failed to parse viewer message");
        }
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `Ok(())` if the message was queued or if serialization failed
/// (permanent error, no point retrying). Returns
/// `Err(ViewerError::ConnectionClosed)` if the writer channel is closed.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ViewerError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}` (permanent error, not retrying)");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ViewerError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn viewer_frames_map_to_authority_commands() {
        let (tx, mut rx) = mpsc::channel(4);
        let session_id = Uuid::new_v4();
        let viewer_id = Uuid::new_v4();

        handle_viewer_message(&tx, session_id, viewer_id, r#"{"type":"request_timer_sync"}"#)
            .await;
        assert!(matches!(
            rx.recv().await,
            Some(AuthorityCommand::RequestSync { viewer }) if viewer == viewer_id
        ));

        handle_viewer_message(&tx, session_id, viewer_id, r#"{"type":"timer_client_expired"}"#)
            .await;
        assert!(matches!(
            rx.recv().await,
            Some(AuthorityCommand::ClientExpired { viewer }) if viewer == viewer_id
        ));
    }

    #[tokio::test]
    async fn unknown_and_malformed_frames_are_dropped() {
        let (tx, mut rx) = mpsc::channel(4);
        let session_id = Uuid::new_v4();
        let viewer_id = Uuid::new_v4();

        handle_viewer_message(&tx, session_id, viewer_id, r#"{"type":"mystery_event"}"#).await;
        handle_viewer_message(&tx, session_id, viewer_id, "not even json").await;

        assert!(rx.try_recv().is_err());
    }
}

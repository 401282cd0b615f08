use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    state::SharedState,
};

const HANDSHAKE_EVENT: &str = "handshake";

/// Subscribe to the shared public SSE stream.
pub async fn subscribe_public(
    state: &SharedState,
) -> (broadcast::Receiver<ServerEvent>, ServerEvent) {
    let receiver = state.public_sse().subscribe();
    let handshake = handshake_event(Handshake {
        stream: "public".into(),
        message: "subscribed to public updates".into(),
        degraded: state.is_degraded().await,
        token: None,
    });
    (receiver, handshake)
}

/// Subscribe to the scorer SSE stream, claiming the scorer token.
///
/// Only one scorer stream may be open at a time; the token it receives
/// authenticates every scorer command until the stream closes.
pub async fn subscribe_scorer(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, ServerEvent), ServiceError> {
    let token = claim_scorer_token(state).await?;
    let receiver = state.scorer_sse().subscribe();
    let handshake = handshake_event(Handshake {
        stream: "scorer".into(),
        message: "scorer session opened".into(),
        degraded: state.is_degraded().await,
        token: Some(token),
    });
    Ok((receiver, handshake))
}

/// Target SSE stream, so teardown can release stream-specific resources.
#[derive(Clone)]
pub enum StreamKind {
    Public,
    /// Holds the state so the scorer token can be released once the client leaves.
    Scorer(SharedState),
}

/// Convert a broadcast receiver into an SSE response. `first` is sent before any
/// broadcast event.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    first: ServerEvent,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if tx.send(Ok(to_event(first))).await.is_ok() {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    recv_result = receiver.recv() => {
                        match recv_result {
                            Ok(payload) => {
                                if tx.send(Ok(to_event(payload))).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Closed) => break,
                            Err(RecvError::Lagged(skipped)) => {
                                // Later game.updated events carry the full state again.
                                warn!(skipped, "SSE subscriber lagged behind");
                                continue;
                            }
                        }
                    }
                }
            }
        }

        match kind {
            StreamKind::Public => info!("public SSE stream disconnected"),
            StreamKind::Scorer(state) => {
                reset_scorer_token(&state).await;
                info!("scorer SSE stream disconnected; token released")
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

fn handshake_event(handshake: Handshake) -> ServerEvent {
    ServerEvent::json(Some(HANDSHAKE_EVENT.to_string()), &handshake).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize SSE handshake");
        ServerEvent {
            event: Some(HANDSHAKE_EVENT.to_string()),
            data: String::new(),
        }
    })
}

/// Reserve the scorer seat for a new stream, failing if another stream holds it.
async fn claim_scorer_token(state: &SharedState) -> Result<String, ServiceError> {
    state.scorer_seat().claim().await.ok_or_else(|| {
        ServiceError::Unauthorized("another scorer SSE stream is already active".into())
    })
}

async fn reset_scorer_token(state: &SharedState) {
    state.scorer_seat().release().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn second_scorer_stream_is_rejected_until_release() {
        let state = AppState::new(AppConfig::default());
        let (_rx, handshake) = subscribe_scorer(&state).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&handshake.data).unwrap();
        let token = body["token"].as_str().unwrap().to_string();

        assert!(matches!(
            subscribe_scorer(&state).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(
            state.scorer_seat().check(&token).await,
            crate::state::SeatCheck::Granted
        );

        reset_scorer_token(&state).await;
        assert!(subscribe_scorer(&state).await.is_ok());
    }

    #[tokio::test]
    async fn public_handshake_has_no_token() {
        let state = AppState::new(AppConfig::default());
        let (_rx, handshake) = subscribe_public(&state).await;
        assert_eq!(handshake.event.as_deref(), Some(HANDSHAKE_EVENT));
        let body: serde_json::Value = serde_json::from_str(&handshake.data).unwrap();
        assert_eq!(body["stream"], "public");
        assert_eq!(body["degraded"], true);
        assert!(body.get("token").is_none());
    }
}

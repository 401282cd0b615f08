use tokio::sync::{Mutex, broadcast};
use tracing::trace;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Spectator hub, scorer hub and the seat of the one scorer allowed to drive the game.
pub(super) struct SseState {
    pub(super) public: SseHub,
    pub(super) scorer: SseHub,
    pub(super) seat: ScorerSeat,
}

impl SseState {
    pub(super) fn new(public_capacity: usize, scorer_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            scorer: SseHub::new(scorer_capacity),
            seat: ScorerSeat::default(),
        }
    }
}

/// Broadcast channel feeding one kind of SSE stream.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Fan `event` out to the open streams. Nobody listening is not an error.
    pub fn broadcast(&self, event: ServerEvent) {
        if let Err(unsent) = self.sender.send(event) {
            trace!(event = ?unsent.0.event, "no SSE subscriber for event");
        }
    }
}

/// Outcome of presenting a scorer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatCheck {
    Granted,
    WrongToken,
    /// No scorer stream is open, so no token is valid.
    Vacant,
}

/// The scorer seat. Whoever holds the scorer SSE stream holds its token.
#[derive(Default)]
pub struct ScorerSeat {
    token: Mutex<Option<String>>,
}

impl ScorerSeat {
    /// Take the seat, returning the new token, or `None` when it is already taken.
    pub async fn claim(&self) -> Option<String> {
        let mut token = self.token.lock().await;
        if token.is_some() {
            return None;
        }
        let fresh = Uuid::new_v4().simple().to_string();
        *token = Some(fresh.clone());
        Some(fresh)
    }

    pub async fn release(&self) {
        self.token.lock().await.take();
    }

    pub async fn check(&self, provided: &str) -> SeatCheck {
        match self.token.lock().await.as_deref() {
            Some(token) if token == provided => SeatCheck::Granted,
            Some(_) => SeatCheck::WrongToken,
            None => SeatCheck::Vacant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seat_holds_one_scorer_at_a_time() {
        let seat = ScorerSeat::default();
        assert_eq!(seat.check("anything").await, SeatCheck::Vacant);

        let token = seat.claim().await.unwrap();
        assert!(seat.claim().await.is_none());
        assert_eq!(seat.check(&token).await, SeatCheck::Granted);
        assert_eq!(seat.check("stale").await, SeatCheck::WrongToken);

        seat.release().await;
        assert_eq!(seat.check(&token).await, SeatCheck::Vacant);
        assert_ne!(seat.claim().await, Some(token));
    }
}

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    common::{ClockSnapshot, GamePhaseSnapshot},
    public::GameView,
    stat::PlayOutcomeResponse,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `scorer`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    /// Token to send as `X-Scorer-Token`, only on the scorer stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the game phase changes.
pub struct PhaseChangedEvent(pub GamePhaseSnapshot);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast after every change of the loaded game; replaces the client's copy.
pub struct GameUpdatedEvent(pub GameView);

#[derive(Debug, Serialize, ToSchema)]
/// Periodic clock reading while the game clock runs.
pub struct ClockTickEvent {
    pub game_id: Uuid,
    pub clock: ClockSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once when the shot clock reaches zero.
pub struct ShotClockExpiredEvent {
    pub game_id: Uuid,
    pub period: u8,
    pub clock_remaining_ms: u32,
    /// Team that held the ball.
    pub possession: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Scorer-only detail of what a stat or prompt answer produced.
pub struct PlayRecordedEvent(pub PlayOutcomeResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when stat events were removed by an undo.
pub struct StatsUndoneEvent {
    pub game_id: Uuid,
    pub removed_ids: Vec<Uuid>,
}

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::phase::PhaseView, state::clock::GameClock};
use std::time::Instant;

/// Shared snapshot describing the current phase and related context.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct GamePhaseSnapshot {
    pub phase: PhaseView,
    pub game_id: Option<Uuid>,
    /// True when the backend operates in degraded mode (no connection to the database).
    pub degraded: bool,
}

/// Game and shot clock reading.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub period: u8,
    pub remaining_ms: u32,
    /// Absent when the game is played without a shot clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot_clock_ms: Option<u32>,
    pub running: bool,
}

impl ClockSnapshot {
    /// Read `clock` at `now`.
    pub fn read(clock: &GameClock, now: Instant) -> Self {
        Self {
            period: clock.period(),
            remaining_ms: clock.remaining_ms(now),
            shot_clock_ms: clock.shot_clock_ms(now),
            running: clock.is_running(),
        }
    }
}

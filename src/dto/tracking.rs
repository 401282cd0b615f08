use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{common::ClockSnapshot, phase::PhaseView};

/// Tip-off payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TipOffRequest {
    /// Team that won the jump ball and gets the first possession.
    pub jump_ball_winner: Uuid,
}

/// Manual game clock correction. Only accepted while the clock is stopped.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetClockRequest {
    #[validate(range(max = 3_600_000))]
    pub remaining_ms: u32,
}

/// Shot clock reset.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ShotClockResetRequest {
    /// Use the short reset (offensive rebound) instead of a full one.
    #[serde(default)]
    pub short: bool,
}

/// Team calling a timeout.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TimeoutRequest {
    pub team_id: Uuid,
}

/// Player change.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubstitutionRequest {
    pub team_id: Uuid,
    pub player_out: Uuid,
    pub player_in: Uuid,
}

/// Possession arrow set by hand; `null` clears it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PossessionRequest {
    pub team_id: Option<Uuid>,
}

/// Clock reading together with the resulting phase.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClockResponse {
    pub phase: PhaseView,
    pub clock: ClockSnapshot,
}

/// Outcome of a timeout call.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimeoutResponse {
    pub team_id: Uuid,
    pub timeouts_left: u8,
}

/// Recorded substitution.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubstitutionResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub player_out: Uuid,
    pub player_in: Uuid,
    pub period: u8,
    pub clock_remaining_ms: u32,
}

/// Possession after a manual change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PossessionResponse {
    pub team_id: Option<Uuid>,
}

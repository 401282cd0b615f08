use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::state_machine::{BreakKind, GamePhase, LivePhase, StopReason};

/// Game phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGamePhase {
    /// No game is loaded.
    Idle,
    /// Game loaded, waiting for the tip-off.
    Scheduled,
    /// Live with the game clock running.
    ClockRunning,
    /// Live with the game clock stopped.
    ClockStopped,
    /// A team called a timeout.
    Timeout,
    /// Between two periods.
    PeriodBreak,
    /// Game is over.
    Final,
}

/// Why the clock is stopped.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReasonDto {
    PeriodStart,
    Whistle,
    PeriodExpired,
    AfterTimeout,
    Resumed,
}

/// Kind of break between periods.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakKindDto {
    Quarter,
    Halftime,
    BeforeOvertime,
}

/// Phase plus the detail attached to it.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
pub struct PhaseView {
    pub phase: VisibleGamePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReasonDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_kind: Option<BreakKindDto>,
    /// Team that called the running timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_team_id: Option<Uuid>,
}

impl From<StopReason> for StopReasonDto {
    fn from(value: StopReason) -> Self {
        match value {
            StopReason::PeriodStart => StopReasonDto::PeriodStart,
            StopReason::Whistle => StopReasonDto::Whistle,
            StopReason::PeriodExpired => StopReasonDto::PeriodExpired,
            StopReason::AfterTimeout => StopReasonDto::AfterTimeout,
            StopReason::Resumed => StopReasonDto::Resumed,
        }
    }
}

impl From<BreakKind> for BreakKindDto {
    fn from(value: BreakKind) -> Self {
        match value {
            BreakKind::Quarter => BreakKindDto::Quarter,
            BreakKind::Halftime => BreakKindDto::Halftime,
            BreakKind::BeforeOvertime => BreakKindDto::BeforeOvertime,
        }
    }
}

impl PhaseView {
    fn plain(phase: VisibleGamePhase) -> Self {
        Self {
            phase,
            stop_reason: None,
            break_kind: None,
            timeout_team_id: None,
        }
    }
}

impl From<GamePhase> for PhaseView {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Idle => Self::plain(VisibleGamePhase::Idle),
            GamePhase::Scheduled => Self::plain(VisibleGamePhase::Scheduled),
            GamePhase::Final => Self::plain(VisibleGamePhase::Final),
            GamePhase::Live(LivePhase::ClockRunning) => Self::plain(VisibleGamePhase::ClockRunning),
            GamePhase::Live(LivePhase::ClockStopped(reason)) => Self {
                stop_reason: Some(reason.into()),
                ..Self::plain(VisibleGamePhase::ClockStopped)
            },
            GamePhase::Live(LivePhase::Timeout { team_id }) => Self {
                timeout_team_id: Some(team_id),
                ..Self::plain(VisibleGamePhase::Timeout)
            },
            GamePhase::Live(LivePhase::PeriodBreak(kind)) => Self {
                break_kind: Some(kind.into()),
                ..Self::plain(VisibleGamePhase::PeriodBreak)
            },
        }
    }
}

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    config::GameRules,
    engine::{StatModifier, StatType},
};

/// Lifecycle status stored with a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created, not tipped off.
    #[default]
    Scheduled,
    /// Tipped off and not final.
    InProgress,
    /// Over.
    Final,
}

/// Player on a team roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Jersey number, unique within the team.
    pub number: u8,
}

/// Team embedded in a game document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Roster in display order.
    pub players: Vec<PlayerEntity>,
    /// Players currently on court.
    #[serde(default)]
    pub on_court: Vec<Uuid>,
    /// Timeouts charged so far.
    #[serde(default)]
    pub timeouts_used: u8,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the game.
    pub name: String,
    /// Tournament grouping key.
    pub tournament_id: Option<Uuid>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Rules the game is played with.
    pub rules: GameRules,
    /// Home team.
    pub home: TeamEntity,
    /// Away team.
    pub away: TeamEntity,
    /// Current period (1-based).
    pub period: u8,
    /// Game clock left in the current period.
    pub clock_remaining_ms: u32,
    /// Shot clock reading, when the rules have one.
    pub shot_clock_ms: Option<u32>,
    /// Team holding the ball.
    pub possession: Option<Uuid>,
}

/// Aggregate game list item entity (subset of GameEntity) persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameListItemEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the game.
    pub name: String,
    /// Tournament grouping key.
    pub tournament_id: Option<Uuid>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Home team summary.
    pub home: TeamSummaryEntity,
    /// Away team summary.
    pub away: TeamSummaryEntity,
}

/// Summary representation of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamSummaryEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

/// Stat event row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStatEntity {
    /// Primary key of the event.
    pub id: Uuid,
    /// Game the event belongs to.
    pub game_id: Uuid,
    /// Team credited with the event.
    pub team_id: Uuid,
    /// Player credited, absent for team stats.
    pub player_id: Option<Uuid>,
    /// Stat kind.
    pub stat_type: StatType,
    /// Stat qualifier.
    pub modifier: Option<StatModifier>,
    /// Period of the event.
    pub period: u8,
    /// Game clock left when the event happened.
    pub clock_remaining_ms: u32,
    /// Wall-clock time the event was recorded.
    pub recorded_at: SystemTime,
    /// Play the event belongs to.
    pub sequence_id: Option<Uuid>,
    /// Event this one is attached to.
    pub linked_event_id: Option<Uuid>,
}

/// Substitution row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubstitutionEntity {
    /// Primary key of the substitution.
    pub id: Uuid,
    /// Game the substitution belongs to.
    pub game_id: Uuid,
    /// Team making the change.
    pub team_id: Uuid,
    /// Player leaving the court.
    pub player_out: Uuid,
    /// Player entering the court.
    pub player_in: Uuid,
    /// Period of the change.
    pub period: u8,
    /// Game clock left at the change.
    pub clock_remaining_ms: u32,
    /// Wall-clock time of the change.
    pub recorded_at: SystemTime,
}

impl From<&TeamEntity> for TeamSummaryEntity {
    fn from(value: &TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
        }
    }
}

impl From<&GameEntity> for GameListItemEntity {
    fn from(entity: &GameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            tournament_id: entity.tournament_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            status: entity.status,
            home: (&entity.home).into(),
            away: (&entity.away).into(),
        }
    }
}

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{GameRules, RuleOverrides, RulesPreset},
    dao::models::{GameEntity, GameListItemEntity, GameStatus, PlayerEntity, TeamEntity},
    dto::{
        format_system_time,
        validation::{MAX_JERSEY_NUMBER, validate_not_blank, validate_overrides, validate_roster},
    },
};

/// Payload used to create a new game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(length(min = 1, max = 100), custom(function = validate_not_blank))]
    pub name: String,
    /// Tournament the game belongs to, if any.
    #[serde(default)]
    pub tournament_id: Option<Uuid>,
    /// Rule set; the configured default when omitted.
    #[serde(default)]
    pub preset: Option<RulesPreset>,
    /// Per-field changes on top of the preset.
    #[serde(default)]
    #[validate(custom(function = validate_overrides))]
    pub rules: Option<RuleOverrides>,
    #[validate(nested)]
    pub home: TeamInput,
    #[validate(nested)]
    pub away: TeamInput,
}

/// Incoming team definition.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TeamInput {
    #[validate(length(min = 1, max = 60), custom(function = validate_not_blank))]
    pub name: String,
    /// Roster in display order. Starters form the initial lineup.
    #[serde(default)]
    #[validate(length(max = 20), custom(function = validate_roster), nested)]
    pub players: Vec<PlayerInput>,
}

/// Incoming player definition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct PlayerInput {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    #[validate(range(max = MAX_JERSEY_NUMBER))]
    pub number: u8,
    /// Whether the player starts on court.
    #[serde(default)]
    pub starter: bool,
}

/// Query string of the game listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListGamesQuery {
    /// Only return games of this tournament.
    pub tournament_id: Option<Uuid>,
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatusDto {
    Scheduled,
    InProgress,
    Final,
}

impl From<GameStatus> for GameStatusDto {
    fn from(value: GameStatus) -> Self {
        match value {
            GameStatus::Scheduled => GameStatusDto::Scheduled,
            GameStatus::InProgress => GameStatusDto::InProgress,
            GameStatus::Final => GameStatusDto::Final,
        }
    }
}

/// Brief projection of a team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamBriefSummary {
    pub id: Uuid,
    pub name: String,
}

/// Game row in listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    pub id: Uuid,
    pub name: String,
    pub tournament_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
    pub status: GameStatusDto,
    pub home: TeamBriefSummary,
    pub away: TeamBriefSummary,
}

/// Player as stored on a roster.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub number: u8,
}

/// Team with its roster and lineup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerSummary>,
    pub on_court: Vec<Uuid>,
    pub timeouts_used: u8,
}

/// Full stored game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameDetails {
    pub id: Uuid,
    pub name: String,
    pub tournament_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
    pub status: GameStatusDto,
    pub rules: GameRules,
    pub home: TeamSummary,
    pub away: TeamSummary,
    pub period: u8,
    pub clock_remaining_ms: u32,
    pub shot_clock_ms: Option<u32>,
    pub possession: Option<Uuid>,
}

impl From<GameListItemEntity> for GameSummary {
    fn from(entity: GameListItemEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            tournament_id: entity.tournament_id,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
            status: entity.status.into(),
            home: TeamBriefSummary {
                id: entity.home.id,
                name: entity.home.name,
            },
            away: TeamBriefSummary {
                id: entity.away.id,
                name: entity.away.name,
            },
        }
    }
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
            number: player.number,
        }
    }
}

impl From<TeamEntity> for TeamSummary {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            players: team.players.into_iter().map(Into::into).collect(),
            on_court: team.on_court,
            timeouts_used: team.timeouts_used,
        }
    }
}

impl From<GameEntity> for GameDetails {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            tournament_id: entity.tournament_id,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
            status: entity.status.into(),
            rules: entity.rules,
            home: entity.home.into(),
            away: entity.away.into(),
            period: entity.period,
            clock_remaining_ms: entity.clock_remaining_ms,
            shot_clock_ms: entity.shot_clock_ms,
            possession: entity.possession,
        }
    }
}

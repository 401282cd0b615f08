use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::models::{
        GameEntity, GameListItemEntity, GameStatEntity, GameStatus, SubstitutionEntity,
        TeamEntity, TeamSummaryEntity,
    },
    engine::{StatModifier, StatType},
};

pub const GAMES_TABLE: &str = "games";
pub const STATS_TABLE: &str = "game_stats";
pub const SUBSTITUTIONS_TABLE: &str = "substitutions";

/// Columns read when listing games; skips the rules and rosters.
pub const GAME_LIST_COLUMNS: &str = "id,name,tournament_id,created_at,updated_at,status,home_id:home->>id,home_name:home->>name,away_id:away->>id,away_name:away->>name";

/// `games` row. Rules and teams live in `jsonb` columns.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRow {
    id: Uuid,
    name: String,
    tournament_id: Option<Uuid>,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    created_at: SystemTime,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    updated_at: SystemTime,
    status: GameStatus,
    rules: GameRules,
    home: TeamEntity,
    away: TeamEntity,
    period: u8,
    clock_remaining_ms: u32,
    shot_clock_ms: Option<u32>,
    possession: Option<Uuid>,
}

impl From<GameEntity> for GameRow {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            tournament_id: value.tournament_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            status: value.status,
            rules: value.rules,
            home: value.home,
            away: value.away,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            shot_clock_ms: value.shot_clock_ms,
            possession: value.possession,
        }
    }
}

impl From<GameRow> for GameEntity {
    fn from(value: GameRow) -> Self {
        Self {
            id: value.id,
            name: value.name,
            tournament_id: value.tournament_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            status: value.status,
            rules: value.rules,
            home: value.home,
            away: value.away,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            shot_clock_ms: value.shot_clock_ms,
            possession: value.possession,
        }
    }
}

/// Projection returned for [`GAME_LIST_COLUMNS`].
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct GameListRow {
    id: Uuid,
    name: String,
    tournament_id: Option<Uuid>,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    created_at: SystemTime,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    updated_at: SystemTime,
    status: GameStatus,
    home_id: Uuid,
    home_name: String,
    away_id: Uuid,
    away_name: String,
}

impl From<GameListRow> for GameListItemEntity {
    fn from(value: GameListRow) -> Self {
        Self {
            id: value.id,
            name: value.name,
            tournament_id: value.tournament_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            status: value.status,
            home: TeamSummaryEntity {
                id: value.home_id,
                name: value.home_name,
            },
            away: TeamSummaryEntity {
                id: value.away_id,
                name: value.away_name,
            },
        }
    }
}

/// `game_stats` row. The table's identity column `seq` orders the log and is
/// never sent, so upserts keep the original position.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRow {
    id: Uuid,
    game_id: Uuid,
    team_id: Uuid,
    player_id: Option<Uuid>,
    stat_type: StatType,
    modifier: Option<StatModifier>,
    period: u8,
    clock_remaining_ms: u32,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    recorded_at: SystemTime,
    sequence_id: Option<Uuid>,
    linked_event_id: Option<Uuid>,
}

impl From<GameStatEntity> for StatRow {
    fn from(value: GameStatEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            team_id: value.team_id,
            player_id: value.player_id,
            stat_type: value.stat_type,
            modifier: value.modifier,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: value.recorded_at,
            sequence_id: value.sequence_id,
            linked_event_id: value.linked_event_id,
        }
    }
}

impl From<StatRow> for GameStatEntity {
    fn from(value: StatRow) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            team_id: value.team_id,
            player_id: value.player_id,
            stat_type: value.stat_type,
            modifier: value.modifier,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: value.recorded_at,
            sequence_id: value.sequence_id,
            linked_event_id: value.linked_event_id,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionRow {
    id: Uuid,
    game_id: Uuid,
    team_id: Uuid,
    player_out: Uuid,
    player_in: Uuid,
    period: u8,
    clock_remaining_ms: u32,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    recorded_at: SystemTime,
}

impl From<SubstitutionEntity> for SubstitutionRow {
    fn from(value: SubstitutionEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            team_id: value.team_id,
            player_out: value.player_out,
            player_in: value.player_in,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: value.recorded_at,
        }
    }
}

impl From<SubstitutionRow> for SubstitutionEntity {
    fn from(value: SubstitutionRow) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            team_id: value.team_id,
            player_out: value.player_out,
            player_in: value.player_in,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: value.recorded_at,
        }
    }
}

/// PostgREST filter value for an equality match.
pub fn eq(id: Uuid) -> String {
    format!("eq.{id}")
}

/// PostgREST filter value matching any of `ids`.
pub fn in_list(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_use_postgrest_operators() {
        let a = Uuid::nil();
        assert_eq!(eq(a), format!("eq.{a}"));
        assert_eq!(in_list(&[a, a]), format!("in.({a},{a})"));
    }

    #[test]
    fn stat_row_stores_timestamp_in_millis() {
        let recorded_at = SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(1_500);
        let row = StatRow::from(GameStatEntity {
            id: Uuid::nil(),
            game_id: Uuid::nil(),
            team_id: Uuid::nil(),
            player_id: None,
            stat_type: StatType::FreeThrow,
            modifier: Some(StatModifier::Made),
            period: 2,
            clock_remaining_ms: 12_000,
            recorded_at,
            sequence_id: None,
            linked_event_id: None,
        });
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["recorded_at"], 1_500);

        let back: GameStatEntity = serde_json::from_value::<StatRow>(json).unwrap().into();
        assert_eq!(back.recorded_at, recorded_at);
        assert_eq!(back.period, 2);
    }
}

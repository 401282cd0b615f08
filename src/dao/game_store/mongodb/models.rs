use mongodb::bson::{DateTime, Document, Uuid as BsonUuid, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::models::{GameEntity, GameStatEntity, GameStatus, SubstitutionEntity, TeamEntity},
    engine::{StatModifier, StatType},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    name: String,
    tournament_id: Option<BsonUuid>,
    created_at: DateTime,
    updated_at: DateTime,
    status: GameStatus,
    rules: GameRules,
    home: TeamEntity,
    away: TeamEntity,
    period: u8,
    clock_remaining_ms: u32,
    shot_clock_ms: Option<u32>,
    possession: Option<Uuid>,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            name: value.name,
            tournament_id: value.tournament_id.map(bson_uuid),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
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

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: plain_uuid(value.id),
            name: value.name,
            tournament_id: value.tournament_id.map(plain_uuid),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
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

/// Stat event row. `seq` orders the log since timestamps can collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStatDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_id: BsonUuid,
    seq: i64,
    team_id: Uuid,
    player_id: Option<Uuid>,
    stat_type: StatType,
    modifier: Option<StatModifier>,
    period: u8,
    clock_remaining_ms: u32,
    recorded_at: DateTime,
    sequence_id: Option<Uuid>,
    linked_event_id: Option<Uuid>,
}

impl MongoStatDocument {
    pub fn new(value: GameStatEntity, seq: i64) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_id: bson_uuid(value.game_id),
            seq,
            team_id: value.team_id,
            player_id: value.player_id,
            stat_type: value.stat_type,
            modifier: value.modifier,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: DateTime::from_system_time(value.recorded_at),
            sequence_id: value.sequence_id,
            linked_event_id: value.linked_event_id,
        }
    }
}

impl From<MongoStatDocument> for GameStatEntity {
    fn from(value: MongoStatDocument) -> Self {
        Self {
            id: plain_uuid(value.id),
            game_id: plain_uuid(value.game_id),
            team_id: value.team_id,
            player_id: value.player_id,
            stat_type: value.stat_type,
            modifier: value.modifier,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: value.recorded_at.to_system_time(),
            sequence_id: value.sequence_id,
            linked_event_id: value.linked_event_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSubstitutionDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_id: BsonUuid,
    team_id: Uuid,
    player_out: Uuid,
    player_in: Uuid,
    period: u8,
    clock_remaining_ms: u32,
    recorded_at: DateTime,
}

impl From<SubstitutionEntity> for MongoSubstitutionDocument {
    fn from(value: SubstitutionEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_id: bson_uuid(value.game_id),
            team_id: value.team_id,
            player_out: value.player_out,
            player_in: value.player_in,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: DateTime::from_system_time(value.recorded_at),
        }
    }
}

impl From<MongoSubstitutionDocument> for SubstitutionEntity {
    fn from(value: MongoSubstitutionDocument) -> Self {
        Self {
            id: plain_uuid(value.id),
            game_id: plain_uuid(value.game_id),
            team_id: value.team_id,
            player_out: value.player_out,
            player_in: value.player_in,
            period: value.period,
            clock_remaining_ms: value.clock_remaining_ms,
            recorded_at: value.recorded_at.to_system_time(),
        }
    }
}

pub fn bson_uuid(id: Uuid) -> BsonUuid {
    BsonUuid::from_bytes(id.into_bytes())
}

fn plain_uuid(id: BsonUuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": bson_uuid(id)}
}

pub fn by_game(game_id: Uuid) -> Document {
    doc! {"game_id": bson_uuid(game_id)}
}

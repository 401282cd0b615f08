use std::time::Instant;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        common::ClockSnapshot,
        game::GameStatusDto,
        phase::PhaseView,
        stat::{FreeThrowDto, PromptDto, StatEventDto},
    },
    engine::StatLine,
    state::{
        game::{GameSession, TeamRoster},
        state_machine::GamePhase,
    },
};

/// Player line of the live scoreboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub number: u8,
    pub points: u32,
    pub fouls: u32,
    pub fouled_out: bool,
    pub on_court: bool,
}

/// Team side of the live scoreboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamView {
    pub id: Uuid,
    pub name: String,
    pub points: u32,
    /// Team fouls counted towards the bonus in the current period.
    pub team_fouls: u32,
    pub in_bonus: bool,
    pub timeouts_left: u8,
    pub players: Vec<PlayerView>,
}

/// Complete live state of the loaded game. Clients replace their copy with it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameView {
    pub game_id: Uuid,
    pub name: String,
    pub tournament_id: Option<Uuid>,
    pub status: GameStatusDto,
    pub phase: PhaseView,
    pub clock: ClockSnapshot,
    pub possession: Option<Uuid>,
    pub home: TeamView,
    pub away: TeamView,
    /// Question the scorer still has to answer.
    pub pending_prompt: Option<PromptDto>,
    pub free_throws: Option<FreeThrowDto>,
    /// Free-throw sets queued behind the active one.
    pub queued_free_throw_sets: usize,
}

impl GameView {
    /// Project `session` as seen at `now`.
    pub fn build(session: &GameSession, phase: GamePhase, now: Instant) -> Self {
        let period = session.clock.period();
        let box_score = session.box_score();
        let team_view = |team: &TeamRoster| TeamView {
            id: team.id,
            name: team.name.clone(),
            points: box_score.points(team.id),
            team_fouls: session.team_fouls(team.id, period),
            in_bonus: session.in_bonus(team.id, period),
            timeouts_left: session.timeouts_left(team.id),
            players: team
                .players
                .values()
                .map(|player| PlayerView {
                    id: player.id,
                    name: player.name.clone(),
                    number: player.number,
                    points: box_score
                        .team(team.id)
                        .and_then(|line| line.players.get(&player.id))
                        .map_or(0, |line| line.points),
                    fouls: session.player_fouls(player.id),
                    fouled_out: session.is_fouled_out(player.id),
                    on_court: team.is_on_court(player.id),
                })
                .collect(),
        };

        let engine = session.engine();
        Self {
            game_id: session.id,
            name: session.name.clone(),
            tournament_id: session.tournament_id,
            status: session.status.into(),
            phase: phase.into(),
            clock: ClockSnapshot::read(&session.clock, now),
            possession: session.possession,
            home: team_view(&session.home),
            away: team_view(&session.away),
            pending_prompt: engine.pending_prompt().map(Into::into),
            free_throws: engine.free_throws().map(Into::into),
            queued_free_throw_sets: engine.queued_free_throw_sets(),
        }
    }
}

/// Box score line of one player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerBoxLine {
    pub player_id: Uuid,
    pub name: String,
    pub number: u8,
    #[serde(flatten)]
    pub line: StatLine,
    pub rebounds: u32,
}

/// Box score of one team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamBoxScore {
    pub team_id: Uuid,
    pub name: String,
    pub totals: StatLine,
    pub rebounds: u32,
    /// Every roster player in roster order, including those without stats.
    pub players: Vec<PlayerBoxLine>,
}

/// Box score of the loaded game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BoxScoreResponse {
    pub game_id: Uuid,
    pub home: TeamBoxScore,
    pub away: TeamBoxScore,
}

impl From<&GameSession> for BoxScoreResponse {
    fn from(session: &GameSession) -> Self {
        let box_score = session.box_score();
        let team_box = |team: &TeamRoster| {
            let lines = box_score.team(team.id);
            let totals = lines.map(|lines| lines.totals).unwrap_or_default();
            TeamBoxScore {
                team_id: team.id,
                name: team.name.clone(),
                totals,
                rebounds: totals.rebounds(),
                players: team
                    .players
                    .values()
                    .map(|player| {
                        let line = lines
                            .and_then(|lines| lines.players.get(&player.id))
                            .copied()
                            .unwrap_or_default();
                        PlayerBoxLine {
                            player_id: player.id,
                            name: player.name.clone(),
                            number: player.number,
                            line,
                            rebounds: line.rebounds(),
                        }
                    })
                    .collect(),
            }
        };

        Self {
            game_id: session.id,
            home: team_box(&session.home),
            away: team_box(&session.away),
        }
    }
}

/// Play-by-play log of the loaded game, oldest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaysResponse {
    pub game_id: Uuid,
    pub events: Vec<StatEventDto>,
}

impl From<&GameSession> for PlaysResponse {
    fn from(session: &GameSession) -> Self {
        Self {
            game_id: session.id,
            events: session.events.iter().map(Into::into).collect(),
        }
    }
}

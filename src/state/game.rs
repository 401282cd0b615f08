use std::{
    collections::HashSet,
    time::{Instant, SystemTime},
};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::models::{
        GameEntity, GameStatEntity, GameStatus, PlayerEntity, SubstitutionEntity, TeamEntity,
    },
    engine::{
        BoxScore, ClockPosition, EngineError, FreeThrowSequence, PlayContext, PlayEngine,
        PlayOutcome, PromptId, PromptKind, PromptResolution, StatEvent, StatModifier, StatType,
    },
    state::clock::{ClockError, GameClock},
};

/// Players allowed on court per team.
pub const LINEUP_SIZE: usize = 5;

/// Errors raised while mutating a game session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error("team `{0}` does not play in this game")]
    UnknownTeam(Uuid),
    #[error("player `{player_id}` is not on the roster of team `{team_id}`")]
    UnknownPlayer { team_id: Uuid, player_id: Uuid },
    #[error("player `{0}` is not on court")]
    NotOnCourt(Uuid),
    #[error("player `{0}` has fouled out")]
    FouledOut(Uuid),
    #[error("team `{0}` has no timeouts left")]
    NoTimeoutsLeft(Uuid),
    #[error("invalid roster: {0}")]
    InvalidRoster(String),
    #[error("invalid substitution: {0}")]
    InvalidSubstitution(String),
    #[error("no stat event to undo")]
    NothingToUndo,
}

/// Player on a team roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub number: u8,
}

/// A team as tracked during a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRoster {
    pub id: Uuid,
    pub name: String,
    /// Roster keyed by player id, in display order.
    pub players: IndexMap<Uuid, Player>,
    /// Players on court; empty when the scorer does not track lineups.
    pub on_court: Vec<Uuid>,
    pub timeouts_used: u8,
}

impl TeamRoster {
    /// Build a roster, checking jersey numbers and the starting lineup.
    pub fn new(name: String, players: Vec<Player>, starters: Vec<Uuid>) -> Result<Self, SessionError> {
        let mut roster = IndexMap::with_capacity(players.len());
        let mut numbers = HashSet::new();
        for player in players {
            if player.number > 99 {
                return Err(SessionError::InvalidRoster(format!(
                    "jersey number {} is out of range",
                    player.number
                )));
            }
            if !numbers.insert(player.number) {
                return Err(SessionError::InvalidRoster(format!(
                    "jersey number {} is used twice in `{name}`",
                    player.number
                )));
            }
            roster.insert(player.id, player);
        }

        if starters.len() > LINEUP_SIZE {
            return Err(SessionError::InvalidRoster(format!(
                "at most {LINEUP_SIZE} starters allowed"
            )));
        }
        let mut seen = HashSet::new();
        for starter in &starters {
            if !roster.contains_key(starter) || !seen.insert(*starter) {
                return Err(SessionError::InvalidRoster(format!(
                    "starter `{starter}` is not a distinct roster player"
                )));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            players: roster,
            on_court: starters,
            timeouts_used: 0,
        })
    }

    pub fn has_player(&self, player_id: Uuid) -> bool {
        self.players.contains_key(&player_id)
    }

    /// Whether the scorer tracks who is on court for this team.
    pub fn tracks_lineup(&self) -> bool {
        !self.on_court.is_empty()
    }

    pub fn is_on_court(&self, player_id: Uuid) -> bool {
        self.on_court.contains(&player_id)
    }
}

/// A player change recorded by the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub id: Uuid,
    pub team_id: Uuid,
    pub player_out: Uuid,
    pub player_in: Uuid,
    pub position: ClockPosition,
    pub recorded_at: SystemTime,
}

/// A stat submitted by the scorer, before sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInput {
    pub team_id: Uuid,
    pub player_id: Option<Uuid>,
    pub stat_type: StatType,
    pub modifier: Option<StatModifier>,
    pub free_throw_override: Option<u8>,
}

/// Changes waiting to be written to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingWrites {
    pub game: Option<GameEntity>,
    pub stats: Vec<GameStatEntity>,
    pub deleted_stats: Vec<Uuid>,
    pub substitutions: Vec<SubstitutionEntity>,
}

impl PendingWrites {
    pub fn is_empty(&self) -> bool {
        self.game.is_none()
            && self.stats.is_empty()
            && self.deleted_stats.is_empty()
            && self.substitutions.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Outbox {
    game_dirty: bool,
    stats: Vec<GameStatEntity>,
    deleted_stats: Vec<Uuid>,
    substitutions: Vec<SubstitutionEntity>,
}

/// Aggregated state for the game being tracked.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Primary key of the game.
    pub id: Uuid,
    pub name: String,
    pub tournament_id: Option<Uuid>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub status: GameStatus,
    pub rules: GameRules,
    pub home: TeamRoster,
    pub away: TeamRoster,
    pub clock: GameClock,
    /// Team holding the ball.
    pub possession: Option<Uuid>,
    /// Committed stat log, in recording order.
    pub events: Vec<StatEvent>,
    pub substitutions: Vec<Substitution>,
    engine: PlayEngine,
    outbox: Outbox,
}

impl GameSession {
    /// Build a new scheduled game. The game itself is queued for persistence.
    pub fn new(
        name: String,
        tournament_id: Option<Uuid>,
        rules: GameRules,
        home: TeamRoster,
        away: TeamRoster,
    ) -> Self {
        let timestamp = SystemTime::now();
        let engine = PlayEngine::new(home.id, away.id, rules.sequencing());

        Self {
            id: Uuid::new_v4(),
            name,
            tournament_id,
            created_at: timestamp,
            updated_at: timestamp,
            status: GameStatus::Scheduled,
            rules,
            clock: GameClock::new(rules.period_length_ms, rules.shot_clock_ms),
            home,
            away,
            possession: None,
            events: Vec::new(),
            substitutions: Vec::new(),
            engine,
            outbox: Outbox {
                game_dirty: true,
                ..Outbox::default()
            },
        }
    }

    /// Rebuild a session from storage. The play being built is not persisted,
    /// so sequencing restarts from a clean engine.
    pub fn from_entities(
        game: GameEntity,
        stats: Vec<GameStatEntity>,
        substitutions: Vec<SubstitutionEntity>,
    ) -> Self {
        let rules = game.rules;
        let clock = GameClock::restore(
            game.period,
            rules.period_length_ms(game.period),
            game.clock_remaining_ms,
            game.shot_clock_ms,
        );
        let home = TeamRoster::from(game.home);
        let away = TeamRoster::from(game.away);

        Self {
            id: game.id,
            name: game.name,
            tournament_id: game.tournament_id,
            created_at: game.created_at,
            updated_at: game.updated_at,
            status: game.status,
            rules,
            clock,
            engine: PlayEngine::new(home.id, away.id, rules.sequencing()),
            home,
            away,
            possession: game.possession,
            events: stats.into_iter().map(Into::into).collect(),
            substitutions: substitutions.into_iter().map(Into::into).collect(),
            outbox: Outbox::default(),
        }
    }

    /// Storage representation with the clock read at `now`.
    pub fn to_entity(&self, now: Instant) -> GameEntity {
        GameEntity {
            id: self.id,
            name: self.name.clone(),
            tournament_id: self.tournament_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            status: self.status,
            rules: self.rules,
            home: (&self.home).into(),
            away: (&self.away).into(),
            period: self.clock.period(),
            clock_remaining_ms: self.clock.remaining_ms(now),
            shot_clock_ms: self.clock.shot_clock_ms(now),
            possession: self.possession,
        }
    }

    pub fn engine(&self) -> &PlayEngine {
        &self.engine
    }

    pub fn team_ids(&self) -> [Uuid; 2] {
        [self.home.id, self.away.id]
    }

    pub fn team(&self, team_id: Uuid) -> Option<&TeamRoster> {
        [&self.home, &self.away]
            .into_iter()
            .find(|team| team.id == team_id)
    }

    fn team_mut(&mut self, team_id: Uuid) -> Result<&mut TeamRoster, SessionError> {
        if self.home.id == team_id {
            Ok(&mut self.home)
        } else if self.away.id == team_id {
            Ok(&mut self.away)
        } else {
            Err(SessionError::UnknownTeam(team_id))
        }
    }

    fn require_team(&self, team_id: Uuid) -> Result<&TeamRoster, SessionError> {
        self.team(team_id).ok_or(SessionError::UnknownTeam(team_id))
    }

    pub fn box_score(&self) -> BoxScore {
        BoxScore::compute(self.team_ids(), &self.events)
    }

    pub fn points(&self, team_id: Uuid) -> u32 {
        self.events
            .iter()
            .filter(|event| event.team_id == team_id)
            .map(StatEvent::points)
            .sum()
    }

    /// Team fouls counted towards the bonus in `period`. Technicals do not count.
    pub fn team_fouls(&self, team_id: Uuid, period: u8) -> u32 {
        let counted = self.rules.foul_period(period);
        let fouls = self
            .events
            .iter()
            .filter(|event| event.team_id == team_id)
            .filter(|event| self.rules.foul_period(event.position.period) == counted)
            .filter(|event| {
                matches!(event.foul_kind(), Some(kind) if kind != StatModifier::Technical)
            })
            .count();
        u32::try_from(fouls).unwrap_or(u32::MAX)
    }

    /// Whether `team_id` is in the bonus in `period`.
    pub fn in_bonus(&self, team_id: Uuid, period: u8) -> bool {
        self.team_fouls(team_id, period) >= u32::from(self.rules.team_fouls_for_bonus)
    }

    /// Every foul charged to a player, technicals included.
    pub fn player_fouls(&self, player_id: Uuid) -> u32 {
        let fouls = self
            .events
            .iter()
            .filter(|event| event.player_id == Some(player_id))
            .filter(|event| event.stat_type == StatType::Foul)
            .count();
        u32::try_from(fouls).unwrap_or(u32::MAX)
    }

    pub fn is_fouled_out(&self, player_id: Uuid) -> bool {
        self.player_fouls(player_id) >= u32::from(self.rules.personal_foul_limit)
    }

    pub fn fouled_out_players(&self) -> Vec<Uuid> {
        self.home
            .players
            .keys()
            .chain(self.away.players.keys())
            .copied()
            .filter(|player| self.is_fouled_out(*player))
            .collect()
    }

    pub fn timeouts_left(&self, team_id: Uuid) -> u8 {
        self.team(team_id).map_or(0, |team| {
            self.rules.timeouts_per_game.saturating_sub(team.timeouts_used)
        })
    }

    /// Validate and sequence one stat, appending what the engine commits.
    pub fn record_stat(
        &mut self,
        input: StatInput,
        now: Instant,
    ) -> Result<PlayOutcome, SessionError> {
        let team = self.require_team(input.team_id)?;
        if let Some(player_id) = input.player_id {
            self.check_player(team, player_id, input.foul_kind())?;
        }

        let position = self.clock.position(now);
        let fouling_team_in_bonus = match input.foul_kind() {
            Some(StatModifier::Technical) | None => false,
            Some(_) => {
                self.team_fouls(input.team_id, position.period) + 1
                    >= u32::from(self.rules.team_fouls_for_bonus)
            }
        };
        let context = PlayContext {
            possession: self.possession,
            fouling_team_in_bonus,
            free_throw_override: input.free_throw_override,
        };

        let event = StatEvent::new(
            input.team_id,
            input.player_id,
            input.stat_type,
            input.modifier,
            position,
        );
        let outcome = self.engine.process(event, context)?;
        self.apply_outcome(&outcome, now);
        Ok(outcome)
    }

    /// Answer the pending prompt.
    pub fn resolve_prompt(
        &mut self,
        prompt_id: PromptId,
        resolution: PromptResolution,
        now: Instant,
    ) -> Result<PlayOutcome, SessionError> {
        if let (Some(prompt), Some(player_id)) = (self.engine.pending_prompt(), resolution.player_id)
        {
            let team_id = match prompt.kind {
                PromptKind::Rebound => resolution.team_id,
                PromptKind::Assist | PromptKind::TurnoverBy => prompt.team_id,
            };
            if let Some(team_id) = team_id {
                let team = self.require_team(team_id)?;
                if !team.has_player(player_id) {
                    return Err(SessionError::UnknownPlayer { team_id, player_id });
                }
            }
        }

        let outcome = self.engine.resolve_prompt(prompt_id, resolution)?;
        self.apply_outcome(&outcome, now);
        Ok(outcome)
    }

    pub fn skip_prompt(
        &mut self,
        prompt_id: PromptId,
        now: Instant,
    ) -> Result<PlayOutcome, SessionError> {
        let outcome = self.engine.skip_prompt(prompt_id)?;
        self.apply_outcome(&outcome, now);
        Ok(outcome)
    }

    pub fn cancel_free_throws(&mut self) -> Option<FreeThrowSequence> {
        self.engine.cancel_free_throws()
    }

    /// Remove the last committed event and every event linked to it.
    pub fn undo_last(&mut self) -> Result<Vec<StatEvent>, SessionError> {
        let last = self.events.last().ok_or(SessionError::NothingToUndo)?;

        let mut removed_ids = HashSet::from([last.id]);
        loop {
            let before = removed_ids.len();
            for event in &self.events {
                if event
                    .linked_event_id
                    .is_some_and(|linked| removed_ids.contains(&linked))
                {
                    removed_ids.insert(event.id);
                }
            }
            if removed_ids.len() == before {
                break;
            }
        }

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .events
            .drain(..)
            .partition(|event| removed_ids.contains(&event.id));
        self.events = kept;

        for event in &removed {
            let unsent = self.outbox.stats.len();
            self.outbox.stats.retain(|stat| stat.id != event.id);
            if self.outbox.stats.len() == unsent {
                self.outbox.deleted_stats.push(event.id);
            }
        }

        self.engine.reset();
        self.touch();
        debug!(game_id = %self.id, count = removed.len(), "stat events undone");
        Ok(removed)
    }

    /// Swap a player on court for one on the bench.
    pub fn substitute(
        &mut self,
        team_id: Uuid,
        player_out: Uuid,
        player_in: Uuid,
        now: Instant,
    ) -> Result<Substitution, SessionError> {
        let fouled_out = self.is_fouled_out(player_in);
        let position = self.clock.position(now);
        let team = self.team_mut(team_id)?;

        for player_id in [player_out, player_in] {
            if !team.has_player(player_id) {
                return Err(SessionError::UnknownPlayer { team_id, player_id });
            }
        }
        let Some(slot) = team.on_court.iter().position(|id| *id == player_out) else {
            return Err(SessionError::NotOnCourt(player_out));
        };
        if team.is_on_court(player_in) {
            return Err(SessionError::InvalidSubstitution(format!(
                "player `{player_in}` is already on court"
            )));
        }
        if fouled_out {
            return Err(SessionError::FouledOut(player_in));
        }
        team.on_court[slot] = player_in;

        let substitution = Substitution {
            id: Uuid::new_v4(),
            team_id,
            player_out,
            player_in,
            position,
            recorded_at: SystemTime::now(),
        };
        self.outbox
            .substitutions
            .push(substitution_entity(self.id, &substitution));
        self.substitutions.push(substitution.clone());
        self.touch();
        Ok(substitution)
    }

    /// Hand the ball to `team_id` by hand. The play being built ends here.
    pub fn set_possession(
        &mut self,
        team_id: Option<Uuid>,
        now: Instant,
    ) -> Result<(), SessionError> {
        if let Some(team_id) = team_id {
            self.require_team(team_id)?;
        }
        self.end_play(now);
        self.possession = team_id;
        self.touch();
        Ok(())
    }

    /// Charge a timeout to `team_id`.
    pub fn charge_timeout(&mut self, team_id: Uuid) -> Result<u8, SessionError> {
        let allowance = self.rules.timeouts_per_game;
        let team = self.team_mut(team_id)?;
        if team.timeouts_used >= allowance {
            return Err(SessionError::NoTimeoutsLeft(team_id));
        }
        team.timeouts_used += 1;
        let left = allowance - team.timeouts_used;
        self.touch();
        Ok(left)
    }

    /// Put a full, stopped clock on the next period.
    pub fn begin_next_period(&mut self, now: Instant) -> Result<u8, SessionError> {
        let next = self.clock.period().saturating_add(1);
        self.clock.begin_period(
            next,
            self.rules.period_length_ms(next),
            self.rules.shot_clock_ms,
        )?;
        self.end_play(now);
        self.touch();
        Ok(next)
    }

    /// Mark the game document as changed.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
        self.outbox.game_dirty = true;
    }

    pub fn has_pending_writes(&self) -> bool {
        self.outbox.game_dirty
            || !self.outbox.stats.is_empty()
            || !self.outbox.deleted_stats.is_empty()
            || !self.outbox.substitutions.is_empty()
    }

    /// Drain the outbox; the game document is snapshotted at `now`.
    pub fn take_pending_writes(&mut self, now: Instant) -> PendingWrites {
        let outbox = std::mem::take(&mut self.outbox);
        PendingWrites {
            game: outbox.game_dirty.then(|| self.to_entity(now)),
            stats: outbox.stats,
            deleted_stats: outbox.deleted_stats,
            substitutions: outbox.substitutions,
        }
    }

    /// Put back writes that storage did not accept, ahead of newer ones.
    pub fn restore_pending_writes(&mut self, writes: PendingWrites) {
        let deleted: HashSet<Uuid> = self.outbox.deleted_stats.iter().copied().collect();
        self.outbox.game_dirty |= writes.game.is_some();

        let mut stats: Vec<_> = writes
            .stats
            .into_iter()
            .filter(|stat| !deleted.contains(&stat.id))
            .collect();
        self.outbox
            .deleted_stats
            .retain(|id| !writes.deleted_stats.contains(id));
        stats.append(&mut self.outbox.stats);
        self.outbox.stats = stats;

        let mut deleted_stats = writes.deleted_stats;
        deleted_stats.append(&mut self.outbox.deleted_stats);
        self.outbox.deleted_stats = deleted_stats;

        let mut substitutions = writes.substitutions;
        substitutions.append(&mut self.outbox.substitutions);
        self.outbox.substitutions = substitutions;
    }

    fn check_player(
        &self,
        team: &TeamRoster,
        player_id: Uuid,
        foul: Option<StatModifier>,
    ) -> Result<(), SessionError> {
        if !team.has_player(player_id) {
            return Err(SessionError::UnknownPlayer {
                team_id: team.id,
                player_id,
            });
        }
        // Bench players can still be charged with a technical.
        if foul == Some(StatModifier::Technical) {
            return Ok(());
        }
        if team.tracks_lineup() && !team.is_on_court(player_id) {
            return Err(SessionError::NotOnCourt(player_id));
        }
        if self.is_fouled_out(player_id) {
            return Err(SessionError::FouledOut(player_id));
        }
        Ok(())
    }

    /// Close the engine's play on a dead ball it did not see.
    fn end_play(&mut self, now: Instant) {
        let outcome = self.engine.end_play();
        if !outcome.skipped.is_empty() {
            debug!(game_id = %self.id, skipped = outcome.skipped.len(), "open prompt settled");
        }
        self.apply_outcome(&outcome, now);
    }

    fn apply_outcome(&mut self, outcome: &PlayOutcome, now: Instant) {
        for event in &outcome.committed {
            self.outbox.stats.push(stat_entity(self.id, event));
            self.events.push(event.clone());
        }

        let offensive_rebound = outcome
            .committed
            .iter()
            .any(|event| {
                event.stat_type == StatType::Rebound
                    && event.modifier == Some(StatModifier::Offensive)
            });
        let changed_hands = outcome
            .possession
            .is_some_and(|team| self.possession != Some(team));

        if let Some(team) = outcome.possession {
            self.possession = Some(team);
        }

        let reset = if changed_hands {
            self.rules.shot_clock_ms
        } else if offensive_rebound {
            self.rules.shot_clock_short_ms
        } else {
            None
        };
        if let Some(shot_clock_ms) = reset {
            if let Err(err) = self.clock.reset_shot_clock(shot_clock_ms, now) {
                debug!(game_id = %self.id, error = %err, "shot clock not reset");
            }
        }

        if !outcome.committed.is_empty() || outcome.possession.is_some() {
            self.touch();
        }
    }
}

impl StatInput {
    fn foul_kind(&self) -> Option<StatModifier> {
        match self.stat_type {
            StatType::Foul => self.modifier,
            _ => None,
        }
    }
}

/// Storage row of a stat event.
pub fn stat_entity(game_id: Uuid, event: &StatEvent) -> GameStatEntity {
    GameStatEntity {
        id: event.id,
        game_id,
        team_id: event.team_id,
        player_id: event.player_id,
        stat_type: event.stat_type,
        modifier: event.modifier,
        period: event.position.period,
        clock_remaining_ms: event.position.remaining_ms,
        recorded_at: event.recorded_at,
        sequence_id: event.sequence_id,
        linked_event_id: event.linked_event_id,
    }
}

fn substitution_entity(game_id: Uuid, substitution: &Substitution) -> SubstitutionEntity {
    SubstitutionEntity {
        id: substitution.id,
        game_id,
        team_id: substitution.team_id,
        player_out: substitution.player_out,
        player_in: substitution.player_in,
        period: substitution.position.period,
        clock_remaining_ms: substitution.position.remaining_ms,
        recorded_at: substitution.recorded_at,
    }
}

impl From<GameStatEntity> for StatEvent {
    fn from(value: GameStatEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            player_id: value.player_id,
            stat_type: value.stat_type,
            modifier: value.modifier,
            position: ClockPosition {
                period: value.period,
                remaining_ms: value.clock_remaining_ms,
            },
            recorded_at: value.recorded_at,
            sequence_id: value.sequence_id,
            linked_event_id: value.linked_event_id,
        }
    }
}

impl From<SubstitutionEntity> for Substitution {
    fn from(value: SubstitutionEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            player_out: value.player_out,
            player_in: value.player_in,
            position: ClockPosition {
                period: value.period,
                remaining_ms: value.clock_remaining_ms,
            },
            recorded_at: value.recorded_at,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            number: value.number,
        }
    }
}

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            number: value.number,
        }
    }
}

impl From<TeamEntity> for TeamRoster {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            players: value
                .players
                .into_iter()
                .map(|player| (player.id, player.into()))
                .collect(),
            on_court: value.on_court,
            timeouts_used: value.timeouts_used,
        }
    }
}

impl From<&TeamRoster> for TeamEntity {
    fn from(value: &TeamRoster) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            players: value.players.values().map(Into::into).collect(),
            on_court: value.on_court.clone(),
            timeouts_used: value.timeouts_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{GameRules, RulesPreset};

    fn roster(name: &str, size: u8, starters: usize) -> TeamRoster {
        let players: Vec<Player> = (0..size)
            .map(|number| Player {
                id: Uuid::new_v4(),
                name: format!("{name} #{number}"),
                number,
            })
            .collect();
        let lineup = players.iter().take(starters).map(|p| p.id).collect();
        TeamRoster::new(name.into(), players, lineup).unwrap()
    }

    fn session() -> GameSession {
        GameSession::new(
            "Final".into(),
            None,
            GameRules::preset(RulesPreset::Fiba),
            roster("Home", 8, 5),
            roster("Away", 8, 0),
        )
    }

    fn player(team: &TeamRoster, index: usize) -> Uuid {
        *team.players.get_index(index).unwrap().0
    }

    fn input(
        team_id: Uuid,
        player_id: Option<Uuid>,
        stat_type: StatType,
        modifier: Option<StatModifier>,
    ) -> StatInput {
        StatInput {
            team_id,
            player_id,
            stat_type,
            modifier,
            free_throw_override: None,
        }
    }

    #[test]
    fn roster_rejects_duplicate_numbers_and_foreign_starters() {
        let a = Player {
            id: Uuid::new_v4(),
            name: "A".into(),
            number: 7,
        };
        let b = Player {
            id: Uuid::new_v4(),
            name: "B".into(),
            number: 7,
        };
        assert!(matches!(
            TeamRoster::new("T".into(), vec![a.clone(), b], vec![]),
            Err(SessionError::InvalidRoster(_))
        ));
        assert!(matches!(
            TeamRoster::new("T".into(), vec![a], vec![Uuid::new_v4()]),
            Err(SessionError::InvalidRoster(_))
        ));
    }

    #[test]
    fn recording_stamps_clock_and_updates_score() {
        let mut game = session();
        let t0 = Instant::now();
        game.clock.start(t0).unwrap();
        let shooter = player(&game.home, 0);

        let at = t0 + Duration::from_secs(30);
        let outcome = game
            .record_stat(
                input(game.home.id, Some(shooter), StatType::ThreePoint, Some(StatModifier::Made)),
                at,
            )
            .unwrap();

        assert_eq!(outcome.committed[0].position.remaining_ms, 570_000);
        assert_eq!(game.points(game.home.id), 3);
        assert_eq!(game.possession, Some(game.away.id));
        assert_eq!(game.clock.shot_clock_ms(at), Some(24_000));
        assert!(game.has_pending_writes());
    }

    #[test]
    fn bench_players_cannot_record_stats() {
        let mut game = session();
        let bench = player(&game.home, 6);
        let err = game
            .record_stat(
                input(game.home.id, Some(bench), StatType::Steal, None),
                Instant::now(),
            )
            .unwrap_err();
        assert_eq!(err, SessionError::NotOnCourt(bench));

        // The away team does not track its lineup.
        let away_bench = player(&game.away, 7);
        game.record_stat(
            input(game.away.id, Some(away_bench), StatType::Steal, None),
            Instant::now(),
        )
        .unwrap();

        let technical = game.record_stat(
            input(game.home.id, Some(bench), StatType::Foul, Some(StatModifier::Technical)),
            Instant::now(),
        );
        assert!(technical.is_ok());
    }

    #[test]
    fn team_fouls_skip_technicals_and_trigger_bonus() {
        let mut game = session();
        let now = Instant::now();
        let away = game.away.id;
        let fouler = player(&game.away, 0);

        game.record_stat(
            input(away, Some(fouler), StatType::Foul, Some(StatModifier::Technical)),
            now,
        )
        .unwrap();
        game.record_stat(
            input(game.home.id, None, StatType::FreeThrow, Some(StatModifier::Made)),
            now,
        )
        .unwrap();
        assert_eq!(game.team_fouls(away, 1), 0);
        assert_eq!(game.player_fouls(fouler), 1);

        for index in 1..4 {
            let outcome = game
                .record_stat(
                    input(away, Some(player(&game.away, index)), StatType::Foul, Some(StatModifier::Personal)),
                    now,
                )
                .unwrap();
            assert!(outcome.free_throws.is_none());
        }
        assert_eq!(game.team_fouls(away, 1), 3);
        assert!(!game.in_bonus(away, 1));

        game.record_stat(
            input(away, Some(player(&game.away, 4)), StatType::Foul, Some(StatModifier::Personal)),
            now,
        )
        .unwrap();
        let fifth = game
            .record_stat(
                input(away, Some(player(&game.away, 5)), StatType::Foul, Some(StatModifier::Personal)),
                now,
            )
            .unwrap();
        assert_eq!(fifth.free_throws.map(|set| set.owed), Some(2));
        assert!(game.in_bonus(away, 1));
        assert_eq!(game.team_fouls(away, 2), 0);
    }

    #[test]
    fn fifth_foul_fouls_player_out() {
        let mut game = session();
        let now = Instant::now();
        let fouler = player(&game.home, 1);
        let away_player = player(&game.away, 0);

        for _ in 0..5 {
            game.record_stat(
                input(game.home.id, Some(fouler), StatType::Foul, Some(StatModifier::Offensive)),
                now,
            )
            .unwrap();
        }
        assert!(game.is_fouled_out(fouler));
        assert_eq!(game.fouled_out_players(), vec![fouler]);

        let err = game
            .record_stat(
                input(game.home.id, Some(fouler), StatType::Steal, None),
                now,
            )
            .unwrap_err();
        assert_eq!(err, SessionError::FouledOut(fouler));
        assert!(!game.is_fouled_out(away_player));
    }

    #[test]
    fn resolving_prompt_checks_player_team() {
        let mut game = session();
        let now = Instant::now();
        let prompt = game
            .record_stat(
                input(game.home.id, Some(player(&game.home, 0)), StatType::TwoPoint, Some(StatModifier::Missed)),
                now,
            )
            .unwrap()
            .prompt
            .unwrap();

        let rebounder = player(&game.away, 3);
        let err = game
            .resolve_prompt(
                prompt.id,
                PromptResolution {
                    player_id: Some(rebounder),
                    team_id: Some(game.home.id),
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownPlayer { .. }));

        game.resolve_prompt(
            prompt.id,
            PromptResolution {
                player_id: Some(rebounder),
                team_id: Some(game.away.id),
            },
            now,
        )
        .unwrap();
        assert_eq!(game.box_score().team(game.away.id).unwrap().totals.defensive_rebounds, 1);
        assert_eq!(game.possession, Some(game.away.id));
    }

    #[test]
    fn offensive_rebound_uses_short_shot_clock() {
        let mut game = session();
        let t0 = Instant::now();
        game.set_possession(Some(game.home.id), t0).unwrap();
        game.clock.start(t0).unwrap();

        let prompt = game
            .record_stat(
                input(game.home.id, None, StatType::TwoPoint, Some(StatModifier::Missed)),
                t0 + Duration::from_secs(20),
            )
            .unwrap()
            .prompt
            .unwrap();
        let at = t0 + Duration::from_secs(21);
        game.resolve_prompt(
            prompt.id,
            PromptResolution {
                player_id: None,
                team_id: Some(game.home.id),
            },
            at,
        )
        .unwrap();

        assert_eq!(game.clock.shot_clock_ms(at), Some(14_000));
    }

    #[test]
    fn undo_removes_linked_events_and_resets_engine() {
        let mut game = session();
        let now = Instant::now();
        let away = game.away.id;
        game.take_pending_writes(now);

        let steal = game
            .record_stat(input(away, None, StatType::Steal, None), now)
            .unwrap();
        let prompt = steal.prompt.unwrap();
        game.skip_prompt(prompt.id, now).unwrap();
        assert_eq!(game.events.len(), 2);

        let removed = game.undo_last().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].stat_type, StatType::Turnover);

        let removed = game.undo_last().unwrap();
        assert_eq!(removed[0].stat_type, StatType::Steal);
        assert!(game.events.is_empty());
        assert!(game.engine().pending_prompt().is_none());
        assert_eq!(game.undo_last().unwrap_err(), SessionError::NothingToUndo);

        let writes = game.take_pending_writes(now);
        assert!(writes.stats.is_empty());
        assert!(writes.deleted_stats.is_empty());
    }

    #[test]
    fn undo_of_persisted_event_queues_delete() {
        let mut game = session();
        let now = Instant::now();
        let outcome = game
            .record_stat(
                input(game.home.id, None, StatType::TwoPoint, Some(StatModifier::Made)),
                now,
            )
            .unwrap();
        let shot = outcome.committed[0].id;
        game.resolve_prompt(
            outcome.prompt.unwrap().id,
            PromptResolution {
                player_id: Some(player(&game.home, 2)),
                team_id: None,
            },
            now,
        )
        .unwrap();
        let flushed = game.take_pending_writes(now);
        assert_eq!(flushed.stats.len(), 2);
        let assist = flushed.stats[1].id;

        let removed = game.undo_last().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, assist);
        let removed = game.undo_last().unwrap();
        assert_eq!(removed[0].id, shot);

        let writes = game.take_pending_writes(now);
        assert_eq!(writes.deleted_stats, vec![assist, shot]);
    }

    #[test]
    fn substitution_swaps_lineup_slot() {
        let mut game = session();
        let now = Instant::now();
        let home = game.home.id;
        let out = player(&game.home, 0);
        let sub_in = player(&game.home, 5);

        game.substitute(home, out, sub_in, now).unwrap();
        assert!(game.home.is_on_court(sub_in));
        assert!(!game.home.is_on_court(out));
        assert_eq!(game.substitutions.len(), 1);

        assert_eq!(
            game.substitute(home, out, sub_in, now).unwrap_err(),
            SessionError::NotOnCourt(out)
        );
        assert!(matches!(
            game.substitute(home, sub_in, player(&game.home, 1), now),
            Err(SessionError::InvalidSubstitution(_))
        ));
    }

    #[test]
    fn timeouts_are_limited_per_game() {
        let mut game = session();
        let home = game.home.id;
        for expected_left in (0..5).rev() {
            assert_eq!(game.charge_timeout(home).unwrap(), expected_left);
        }
        assert_eq!(
            game.charge_timeout(home).unwrap_err(),
            SessionError::NoTimeoutsLeft(home)
        );
        assert_eq!(game.timeouts_left(game.away.id), 5);
    }

    #[test]
    fn failed_writes_go_back_ahead_of_new_ones() {
        let mut game = session();
        let now = Instant::now();
        game.record_stat(input(game.home.id, None, StatType::Turnover, None), now)
            .unwrap();
        let failed = game.take_pending_writes(now);
        assert!(failed.game.is_some());
        assert!(!game.has_pending_writes());

        game.record_stat(input(game.away.id, None, StatType::Turnover, None), now)
            .unwrap();
        let first_id = failed.stats[0].id;
        game.restore_pending_writes(failed);

        let retried = game.take_pending_writes(now);
        assert_eq!(retried.stats.len(), 2);
        assert_eq!(retried.stats[0].id, first_id);
    }

    #[test]
    fn entities_round_trip_the_session() {
        let mut game = session();
        let now = Instant::now();
        game.record_stat(
            input(game.home.id, None, StatType::FreeThrow, Some(StatModifier::Made)),
            now,
        )
        .unwrap();
        let writes = game.take_pending_writes(now);

        let restored = GameSession::from_entities(writes.game.unwrap(), writes.stats, vec![]);
        assert_eq!(restored.id, game.id);
        assert_eq!(restored.home, game.home);
        assert_eq!(restored.events, game.events);
        assert_eq!(restored.points(game.home.id), 1);
        assert!(!restored.has_pending_writes());
    }

    #[test]
    fn next_period_uses_overtime_length() {
        let mut game = session();
        for _ in 0..4 {
            game.begin_next_period(Instant::now()).unwrap();
        }
        assert_eq!(game.clock.period(), 5);
        assert_eq!(game.clock.period_length_ms(), 300_000);
    }

    #[test]
    fn new_period_and_manual_possession_end_the_open_play() {
        let mut game = session();
        let now = Instant::now();
        let prompt = game
            .record_stat(
                input(game.home.id, None, StatType::TwoPoint, Some(StatModifier::Made)),
                now,
            )
            .unwrap()
            .prompt
            .unwrap();

        game.begin_next_period(now).unwrap();
        assert!(game.engine.pending_prompt().is_none());
        assert!(game.skip_prompt(prompt.id, now).is_err());

        game.set_possession(Some(game.home.id), now).unwrap();
        let foul = game
            .record_stat(
                input(game.away.id, None, StatType::Foul, Some(StatModifier::Shooting)),
                now,
            )
            .unwrap();
        assert_eq!(foul.committed[0].linked_event_id, None);
        assert_eq!(foul.free_throws.map(|set| set.owed), Some(2));
    }
}

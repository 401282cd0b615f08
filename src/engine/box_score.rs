//! Aggregation of a stat log into box score lines.

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::stat::{StatEvent, StatModifier, StatType};

/// Counting stats for one player or one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatLine {
    pub points: u32,
    pub field_goals_made: u32,
    pub field_goals_attempted: u32,
    pub three_pointers_made: u32,
    pub three_pointers_attempted: u32,
    pub free_throws_made: u32,
    pub free_throws_attempted: u32,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub fouls: u32,
}

impl StatLine {
    pub fn rebounds(&self) -> u32 {
        self.offensive_rebounds + self.defensive_rebounds
    }

    fn add(&mut self, event: &StatEvent) {
        let made = event.is_made();
        match event.stat_type {
            StatType::TwoPoint | StatType::ThreePoint => {
                self.field_goals_attempted += 1;
                if event.stat_type == StatType::ThreePoint {
                    self.three_pointers_attempted += 1;
                }
                if made {
                    self.field_goals_made += 1;
                    if event.stat_type == StatType::ThreePoint {
                        self.three_pointers_made += 1;
                    }
                }
            }
            StatType::FreeThrow => {
                self.free_throws_attempted += 1;
                if made {
                    self.free_throws_made += 1;
                }
            }
            StatType::Rebound => match event.modifier {
                Some(StatModifier::Offensive) => self.offensive_rebounds += 1,
                _ => self.defensive_rebounds += 1,
            },
            StatType::Assist => self.assists += 1,
            StatType::Steal => self.steals += 1,
            StatType::Block => self.blocks += 1,
            StatType::Turnover => self.turnovers += 1,
            StatType::Foul => self.fouls += 1,
        }
        self.points += event.points();
    }
}

/// Lines of one team: the team total and each player with at least one stat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct TeamBox {
    pub totals: StatLine,
    /// Keyed by player id, in first-appearance order.
    #[schema(value_type = Object)]
    pub players: IndexMap<Uuid, StatLine>,
}

/// Box score of a whole game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BoxScore {
    #[schema(value_type = Object)]
    pub teams: IndexMap<Uuid, TeamBox>,
}

impl BoxScore {
    /// Fold a stat log. `teams` fixes the team order (home first).
    pub fn compute<'a, I>(teams: [Uuid; 2], events: I) -> Self
    where
        I: IntoIterator<Item = &'a StatEvent>,
    {
        let mut teams: IndexMap<Uuid, TeamBox> = teams
            .into_iter()
            .map(|team| (team, TeamBox::default()))
            .collect();

        for event in events {
            let team = teams.entry(event.team_id).or_default();
            team.totals.add(event);
            if let Some(player) = event.player_id {
                team.players.entry(player).or_default().add(event);
            }
        }

        Self { teams }
    }

    pub fn team(&self, team_id: Uuid) -> Option<&TeamBox> {
        self.teams.get(&team_id)
    }

    pub fn points(&self, team_id: Uuid) -> u32 {
        self.team(team_id).map_or(0, |team| team.totals.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stat::ClockPosition;

    fn stat(
        team: Uuid,
        player: Option<Uuid>,
        stat_type: StatType,
        modifier: Option<StatModifier>,
    ) -> StatEvent {
        StatEvent::new(
            team,
            player,
            stat_type,
            modifier,
            ClockPosition {
                period: 1,
                remaining_ms: 480_000,
            },
        )
    }

    #[test]
    fn shooting_lines_count_attempts_and_points() {
        let home = Uuid::new_v4();
        let away = Uuid::new_v4();
        let guard = Uuid::new_v4();
        let events = vec![
            stat(home, Some(guard), StatType::ThreePoint, Some(StatModifier::Made)),
            stat(home, Some(guard), StatType::ThreePoint, Some(StatModifier::Missed)),
            stat(home, Some(guard), StatType::TwoPoint, Some(StatModifier::Made)),
            stat(home, Some(guard), StatType::FreeThrow, Some(StatModifier::Made)),
            stat(home, Some(guard), StatType::FreeThrow, Some(StatModifier::Missed)),
        ];

        let box_score = BoxScore::compute([home, away], &events);
        let line = box_score.team(home).unwrap().players[&guard];

        assert_eq!(line.points, 6);
        assert_eq!(line.field_goals_made, 2);
        assert_eq!(line.field_goals_attempted, 3);
        assert_eq!(line.three_pointers_made, 1);
        assert_eq!(line.three_pointers_attempted, 2);
        assert_eq!(line.free_throws_made, 1);
        assert_eq!(line.free_throws_attempted, 2);
        assert_eq!(box_score.points(home), 6);
        assert_eq!(box_score.points(away), 0);
    }

    #[test]
    fn team_stats_without_player_only_hit_totals() {
        let home = Uuid::new_v4();
        let away = Uuid::new_v4();
        let center = Uuid::new_v4();
        let events = vec![
            stat(away, None, StatType::Rebound, Some(StatModifier::Defensive)),
            stat(away, Some(center), StatType::Rebound, Some(StatModifier::Offensive)),
            stat(away, None, StatType::Turnover, None),
            stat(away, Some(center), StatType::Foul, Some(StatModifier::Personal)),
        ];

        let box_score = BoxScore::compute([home, away], &events);
        let team = box_score.team(away).unwrap();

        assert_eq!(team.totals.rebounds(), 2);
        assert_eq!(team.totals.turnovers, 1);
        assert_eq!(team.players.len(), 1);
        assert_eq!(team.players[&center].offensive_rebounds, 1);
        assert_eq!(team.players[&center].fouls, 1);
        assert_eq!(box_score.teams.keys().copied().collect::<Vec<_>>(), vec![home, away]);
    }
}

//! Application-level configuration loading, including the default game rules.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::engine::SequencingRules;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG_PATH";

const MINUTE_MS: u32 = 60_000;

/// Named rule sets a game can be created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RulesPreset {
    /// International rules.
    #[default]
    Fiba,
    /// Professional north-american rules.
    Nba,
    /// High-school rules, no shot clock.
    Nfhs,
}

/// Rules a game is played and tracked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameRules {
    /// Regulation periods.
    pub periods: u8,
    pub period_length_ms: u32,
    pub overtime_length_ms: u32,
    /// Full shot clock, `None` when the game has no shot clock.
    pub shot_clock_ms: Option<u32>,
    /// Shot clock after an offensive rebound.
    pub shot_clock_short_ms: Option<u32>,
    /// Team fouls in a period from which non-shooting fouls give free throws.
    pub team_fouls_for_bonus: u8,
    pub bonus_free_throws: u8,
    pub technical_free_throws: u8,
    pub flagrant_free_throws: u8,
    /// Fouls after which a player is out of the game.
    pub personal_foul_limit: u8,
    pub timeouts_per_game: u8,
    /// Overtime fouls count with the last regulation period.
    pub overtime_fouls_carry: bool,
    pub prompt_assists: bool,
    pub prompt_rebounds: bool,
}

impl GameRules {
    /// Rules of a named preset.
    pub fn preset(preset: RulesPreset) -> Self {
        match preset {
            RulesPreset::Fiba => Self {
                periods: 4,
                period_length_ms: 10 * MINUTE_MS,
                overtime_length_ms: 5 * MINUTE_MS,
                shot_clock_ms: Some(24_000),
                shot_clock_short_ms: Some(14_000),
                team_fouls_for_bonus: 5,
                bonus_free_throws: 2,
                technical_free_throws: 1,
                flagrant_free_throws: 2,
                personal_foul_limit: 5,
                timeouts_per_game: 5,
                overtime_fouls_carry: true,
                prompt_assists: true,
                prompt_rebounds: true,
            },
            RulesPreset::Nba => Self {
                period_length_ms: 12 * MINUTE_MS,
                personal_foul_limit: 6,
                timeouts_per_game: 7,
                overtime_fouls_carry: false,
                ..Self::preset(RulesPreset::Fiba)
            },
            RulesPreset::Nfhs => Self {
                period_length_ms: 8 * MINUTE_MS,
                overtime_length_ms: 4 * MINUTE_MS,
                shot_clock_ms: None,
                shot_clock_short_ms: None,
                team_fouls_for_bonus: 7,
                technical_free_throws: 2,
                ..Self::preset(RulesPreset::Fiba)
            },
        }
    }

    /// Engine knobs derived from these rules.
    pub fn sequencing(&self) -> SequencingRules {
        SequencingRules {
            prompt_assists: self.prompt_assists,
            prompt_rebounds: self.prompt_rebounds,
            bonus_free_throws: self.bonus_free_throws,
            technical_free_throws: self.technical_free_throws,
            flagrant_free_throws: self.flagrant_free_throws,
        }
    }

    pub fn is_overtime(&self, period: u8) -> bool {
        period > self.periods
    }

    pub fn period_length_ms(&self, period: u8) -> u32 {
        if self.is_overtime(period) {
            self.overtime_length_ms
        } else {
            self.period_length_ms
        }
    }

    /// Last period of the first half.
    pub fn halftime_after(&self) -> u8 {
        self.periods / 2
    }

    /// Period team fouls of `period` are counted in.
    pub fn foul_period(&self, period: u8) -> u8 {
        if self.overtime_fouls_carry && self.is_overtime(period) {
            self.periods
        } else {
            period
        }
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self::preset(RulesPreset::default())
    }
}

/// Per-field changes applied on top of a preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RuleOverrides {
    pub periods: Option<u8>,
    pub period_length_ms: Option<u32>,
    pub overtime_length_ms: Option<u32>,
    pub shot_clock_ms: Option<u32>,
    pub team_fouls_for_bonus: Option<u8>,
    pub bonus_free_throws: Option<u8>,
    pub personal_foul_limit: Option<u8>,
    pub timeouts_per_game: Option<u8>,
    pub prompt_assists: Option<bool>,
    pub prompt_rebounds: Option<bool>,
}

impl RuleOverrides {
    /// Apply every set field to `rules`.
    pub fn apply(&self, mut rules: GameRules) -> GameRules {
        if let Some(periods) = self.periods {
            rules.periods = periods;
        }
        if let Some(length) = self.period_length_ms {
            rules.period_length_ms = length;
        }
        if let Some(length) = self.overtime_length_ms {
            rules.overtime_length_ms = length;
        }
        if let Some(shot_clock) = self.shot_clock_ms {
            rules.shot_clock_ms = Some(shot_clock);
            rules.shot_clock_short_ms = rules.shot_clock_short_ms.map(|short| short.min(shot_clock));
        }
        if let Some(fouls) = self.team_fouls_for_bonus {
            rules.team_fouls_for_bonus = fouls;
        }
        if let Some(shots) = self.bonus_free_throws {
            rules.bonus_free_throws = shots;
        }
        if let Some(limit) = self.personal_foul_limit {
            rules.personal_foul_limit = limit;
        }
        if let Some(timeouts) = self.timeouts_per_game {
            rules.timeouts_per_game = timeouts;
        }
        if let Some(prompt) = self.prompt_assists {
            rules.prompt_assists = prompt;
        }
        if let Some(prompt) = self.prompt_rebounds {
            rules.prompt_rebounds = prompt;
        }
        rules
    }
}

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_preset: RulesPreset,
    overrides: RuleOverrides,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        preset = ?app_config.default_preset,
                        "loaded game rules from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    pub fn default_preset(&self) -> RulesPreset {
        self.default_preset
    }

    /// Rules for a new game.
    ///
    /// Configured overrides only apply to the configured default preset; an
    /// explicitly requested preset starts from its stock values. Request
    /// overrides always win.
    pub fn rules_for(
        &self,
        preset: Option<RulesPreset>,
        overrides: Option<&RuleOverrides>,
    ) -> GameRules {
        let rules = match preset {
            Some(preset) if preset != self.default_preset => GameRules::preset(preset),
            _ => self.overrides.apply(GameRules::preset(self.default_preset)),
        };
        match overrides {
            Some(overrides) => overrides.apply(rules),
            None => rules,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    preset: RulesPreset,
    #[serde(default)]
    rules: RuleOverrides,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            default_preset: value.preset,
            overrides: value.rules,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_where_the_rulebooks_do() {
        let fiba = GameRules::preset(RulesPreset::Fiba);
        let nba = GameRules::preset(RulesPreset::Nba);
        let nfhs = GameRules::preset(RulesPreset::Nfhs);

        assert_eq!(fiba.period_length_ms, 600_000);
        assert_eq!(nba.period_length_ms, 720_000);
        assert_eq!(nba.personal_foul_limit, 6);
        assert_eq!(fiba.personal_foul_limit, 5);
        assert_eq!(nfhs.shot_clock_ms, None);
        assert_eq!(nfhs.technical_free_throws, 2);
        assert_eq!(GameRules::default(), fiba);
    }

    #[test]
    fn overtime_periods_use_overtime_length_and_carry_fouls() {
        let rules = GameRules::preset(RulesPreset::Fiba);
        assert_eq!(rules.period_length_ms(4), 600_000);
        assert_eq!(rules.period_length_ms(5), 300_000);
        assert_eq!(rules.foul_period(6), 4);
        assert_eq!(rules.halftime_after(), 2);

        let nba = GameRules::preset(RulesPreset::Nba);
        assert_eq!(nba.foul_period(5), 5);
    }

    #[test]
    fn overrides_only_touch_set_fields() {
        let overrides = RuleOverrides {
            periods: Some(2),
            period_length_ms: Some(20 * MINUTE_MS),
            prompt_assists: Some(false),
            ..RuleOverrides::default()
        };
        let rules = overrides.apply(GameRules::preset(RulesPreset::Fiba));

        assert_eq!(rules.periods, 2);
        assert_eq!(rules.period_length_ms, 1_200_000);
        assert!(!rules.sequencing().prompt_assists);
        assert!(rules.sequencing().prompt_rebounds);
        assert_eq!(rules.timeouts_per_game, 5);
    }

    #[test]
    fn config_file_sets_default_preset_and_overrides() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "preset": "nba", "rules": { "timeouts_per_game": 6 } }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.default_preset(), RulesPreset::Nba);
        assert_eq!(config.rules_for(None, None).timeouts_per_game, 6);
        assert_eq!(
            config
                .rules_for(Some(RulesPreset::Fiba), None)
                .timeouts_per_game,
            5
        );

        let request = RuleOverrides {
            timeouts_per_game: Some(3),
            ..RuleOverrides::default()
        };
        assert_eq!(
            config
                .rules_for(Some(RulesPreset::Nba), Some(&request))
                .timeouts_per_game,
            3
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.rules_for(None, None), GameRules::default());
    }
}

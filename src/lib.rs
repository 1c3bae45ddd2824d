//! Premier League score prediction
//!
//! Feature engineering over historical football-data.co.uk results and three
//! interchangeable regressors (MLP, random forest, gradient boosting) that
//! predict home and away goals for a fixture.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::features::form::WindowAnchor;
use crate::model::ModelKind;
use crate::predict::inference::FormPolicy;

/// Which side of a fixture a team played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "Home"),
            Side::Away => write!(f, "Away"),
        }
    }
}

/// Shot, corner and card counts for one match.
///
/// Absent columns and blank cells are read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub home_shots: f32,
    pub away_shots: f32,
    pub home_shots_on_target: f32,
    pub away_shots_on_target: f32,
    pub home_corners: f32,
    pub away_corners: f32,
    pub home_yellows: f32,
    pub away_yellows: f32,
    pub home_reds: f32,
    pub away_reds: f32,
}

/// One column of [`MatchStats`], named as in the source CSV files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    HS,
    AS,
    HST,
    AST,
    HC,
    AC,
    HY,
    AY,
    HR,
    AR,
}

impl StatKind {
    pub const ALL: [StatKind; 10] = [
        StatKind::HS,
        StatKind::AS,
        StatKind::HST,
        StatKind::AST,
        StatKind::HC,
        StatKind::AC,
        StatKind::HY,
        StatKind::AY,
        StatKind::HR,
        StatKind::AR,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            StatKind::HS => "HS",
            StatKind::AS => "AS",
            StatKind::HST => "HST",
            StatKind::AST => "AST",
            StatKind::HC => "HC",
            StatKind::AC => "AC",
            StatKind::HY => "HY",
            StatKind::AY => "AY",
            StatKind::HR => "HR",
            StatKind::AR => "AR",
        }
    }

    /// The side whose team the statistic describes
    pub fn side(&self) -> Side {
        match self {
            StatKind::HS | StatKind::HST | StatKind::HC | StatKind::HY | StatKind::HR => Side::Home,
            _ => Side::Away,
        }
    }
}

impl MatchStats {
    pub fn get(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::HS => self.home_shots,
            StatKind::AS => self.away_shots,
            StatKind::HST => self.home_shots_on_target,
            StatKind::AST => self.away_shots_on_target,
            StatKind::HC => self.home_corners,
            StatKind::AC => self.away_corners,
            StatKind::HY => self.home_yellows,
            StatKind::AY => self.away_yellows,
            StatKind::HR => self.home_reds,
            StatKind::AR => self.away_reds,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: f32) {
        let slot = match kind {
            StatKind::HS => &mut self.home_shots,
            StatKind::AS => &mut self.away_shots,
            StatKind::HST => &mut self.home_shots_on_target,
            StatKind::AST => &mut self.away_shots_on_target,
            StatKind::HC => &mut self.home_corners,
            StatKind::AC => &mut self.away_corners,
            StatKind::HY => &mut self.home_yellows,
            StatKind::AY => &mut self.away_yellows,
            StatKind::HR => &mut self.home_reds,
            StatKind::AR => &mut self.away_reds,
        };
        *slot = value;
    }
}

/// A single historical match row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: Option<NaiveDate>,
    /// Source identifier of the season file the row came from
    pub season: String,
    pub home_team: String,
    pub away_team: String,
    /// Full-time home goals (FTHG)
    pub home_goals: u8,
    /// Full-time away goals (FTAG)
    pub away_goals: u8,
    pub stats: MatchStats,
}

impl MatchRecord {
    /// FTHG - FTAG
    pub fn goal_difference(&self) -> i16 {
        self.home_goals as i16 - self.away_goals as i16
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// Check if a team played in this match on either side
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::decide(self.home_goals as i32, self.away_goals as i32)
    }
}

/// Result of a fixture from the home team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl Outcome {
    pub fn decide(home_goals: i32, away_goals: i32) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    /// `"<home> wins"`, `"<away> wins"` or `"Draw"`
    pub fn describe(&self, home_team: &str, away_team: &str) -> String {
        match self {
            Outcome::HomeWin => format!("{} wins", home_team),
            Outcome::AwayWin => format!("{} wins", away_team),
            Outcome::Draw => "Draw".to_string(),
        }
    }
}

/// Predicted score for a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    /// Raw regressor output for home goals
    pub home_goals_raw: f32,
    /// Raw regressor output for away goals
    pub away_goals_raw: f32,
    pub home_goals: i32,
    pub away_goals: i32,
    pub outcome: Outcome,
    /// Form values fed to the model for this fixture
    pub home_form: f32,
    pub away_form: f32,
}

impl Prediction {
    pub fn outcome_label(&self) -> String {
        self.outcome.describe(&self.home_team, &self.away_team)
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FootballError {
    #[error("Source unavailable ({source_id}): {message}")]
    SourceUnavailable { source_id: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] polars::prelude::PolarsError),

    #[error("'{0}' does not exist in the dataset.")]
    TeamNotFound(String),

    #[error("Shape mismatch: expected {expected} columns, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Model fit failed: {0}")]
    FitFailure(String),

    #[error("No trained model found in {0} - run `football train` first")]
    NoModel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FootballError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub split: SplitConfig,
    pub model: ModelSection,
    pub mlp: MlpConfig,
    pub forest: ForestConfig,
    pub boosting: BoostingConfig,
    pub predict: PredictConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Season sources (URLs or local CSV paths), concatenated in this order
    pub seasons: Vec<String>,
    pub cache_dir: String,
    pub model_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub form_window: usize,
    pub window_anchor: WindowAnchor,
    /// Feed HS/AS/HST/AST/HC/AC/HY/AY/HR/AR to the preprocessor as numeric columns
    pub include_match_stats: bool,
    /// Sort the concatenated table by date before computing rolling form
    pub chronological_sort: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub test_ratio: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    pub kind: ModelKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_dims: Vec<usize>,
    /// Dropout after each hidden layer; missing entries mean no dropout
    pub dropouts: Vec<f64>,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of the training split held out (from the end) for validation
    pub validation_split: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f32,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    /// L2 regularisation on leaf weights
    pub lambda: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub mlp_form: FormPolicy,
    pub ensemble_form: FormPolicy,
    pub placeholder_home_form: f32,
    pub placeholder_away_form: f32,
}

impl PredictConfig {
    pub fn policy_for(&self, kind: ModelKind) -> FormPolicy {
        match kind {
            ModelKind::Mlp => self.mlp_form,
            ModelKind::Forest | ModelKind::Boosting => self.ensemble_form,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let seasons = ["2425", "2324", "2223", "2122", "2021", "1920"]
            .iter()
            .map(|s| format!("https://www.football-data.co.uk/mmz4281/{}/E0.csv", s))
            .collect();

        Config {
            data: DataConfig {
                seasons,
                cache_dir: "data".to_string(),
                model_dir: "model".to_string(),
            },
            features: FeatureConfig {
                form_window: 5,
                window_anchor: WindowAnchor::Trailing,
                include_match_stats: false,
                chronological_sort: false,
            },
            split: SplitConfig {
                test_ratio: 0.2,
                seed: 123,
            },
            model: ModelSection {
                kind: ModelKind::Forest,
            },
            mlp: MlpConfig {
                hidden_dims: vec![128, 64, 32],
                dropouts: vec![0.3, 0.2],
                learning_rate: 1e-3,
                epochs: 50,
                batch_size: 32,
                validation_split: 0.1,
                seed: 42,
            },
            forest: ForestConfig {
                n_trees: 100,
                max_depth: None,
                min_samples_split: 2,
                min_samples_leaf: 1,
                seed: 42,
            },
            boosting: BoostingConfig {
                n_rounds: 100,
                learning_rate: 0.1,
                max_depth: 6,
                subsample: 0.8,
                colsample_bytree: 0.8,
                lambda: 1.0,
                seed: 42,
            },
            predict: PredictConfig {
                mlp_form: FormPolicy::Placeholder,
                ensemble_form: FormPolicy::History,
                placeholder_home_form: 1.5,
                placeholder_away_form: 1.2,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FootballError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FootballError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FootballError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord {
            date: None,
            season: "test".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_goals,
            away_goals,
            stats: MatchStats::default(),
        }
    }

    #[test]
    fn test_goal_difference_and_outcome() {
        let m = record(3, 1);
        assert_eq!(m.goal_difference(), 2);
        assert_eq!(m.outcome(), Outcome::HomeWin);
        assert_eq!(record(0, 2).goal_difference(), -2);
        assert_eq!(record(1, 1).outcome(), Outcome::Draw);
    }

    #[test]
    fn test_outcome_description() {
        assert_eq!(Outcome::HomeWin.describe("Man City", "Liverpool"), "Man City wins");
        assert_eq!(Outcome::AwayWin.describe("Man City", "Liverpool"), "Liverpool wins");
        assert_eq!(Outcome::Draw.describe("Man City", "Liverpool"), "Draw");
    }

    #[test]
    fn test_stats_accessors() {
        let mut stats = MatchStats::default();
        for (i, kind) in StatKind::ALL.iter().enumerate() {
            stats.set(*kind, i as f32);
        }
        assert_eq!(stats.get(StatKind::HS), 0.0);
        assert_eq!(stats.get(StatKind::AR), 9.0);
        assert_eq!(StatKind::HST.side(), Side::Home);
        assert_eq!(StatKind::AY.side(), Side::Away);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.data.seasons.len(), 6);
        assert_eq!(parsed.forest.max_depth, None);
        assert_eq!(parsed.mlp.hidden_dims, vec![128, 64, 32]);
        assert_eq!(parsed.predict.policy_for(ModelKind::Mlp), FormPolicy::Placeholder);
        assert_eq!(parsed.predict.policy_for(ModelKind::Boosting), FormPolicy::History);
    }
}

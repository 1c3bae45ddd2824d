//! Model inference for predictions

use serde::{Deserialize, Serialize};

use crate::data::MatchTable;
use crate::features::form::{team_form, team_stat_mean};
use crate::features::{FeatureRow, NumericColumn, Preprocessor};
use crate::model::ScoreModel;
use crate::{Config, FootballError, MatchStats, Outcome, Prediction, Result, Side};

/// Where the form values of a hypothetical fixture come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormPolicy {
    /// Fixed HF/AF values from the configuration
    Placeholder,
    /// Each team's recent form in the history table
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Round raw goal predictions (ties to even) and decide the result
pub fn decide_scoreline(home_raw: f32, away_raw: f32) -> (i32, i32, Outcome) {
    let home = home_raw.round_ties_even() as i32;
    let away = away_raw.round_ties_even() as i32;
    (home, away, Outcome::decide(home, away))
}

/// Predictor for making match predictions
pub struct Predictor {
    preprocessor: Preprocessor,
    model: Box<dyn ScoreModel>,
    history: MatchTable,
    policy: FormPolicy,
    window: usize,
    placeholder_form: (f32, f32),
}

impl Predictor {
    /// Create a predictor with the form policy configured for the model's kind
    pub fn new(
        preprocessor: Preprocessor,
        model: Box<dyn ScoreModel>,
        history: MatchTable,
        config: &Config,
    ) -> Self {
        let policy = config.predict.policy_for(model.kind());
        Predictor {
            preprocessor,
            model,
            history,
            policy,
            window: config.features.form_window,
            placeholder_form: (
                config.predict.placeholder_home_form,
                config.predict.placeholder_away_form,
            ),
        }
    }

    pub fn with_policy(mut self, policy: FormPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FormPolicy {
        self.policy
    }

    /// Predict a single match
    pub fn predict(&self, home_team: &str, away_team: &str) -> Result<Prediction> {
        for team in [home_team, away_team] {
            if !self.history.contains_team(team) {
                return Err(FootballError::TeamNotFound(team.to_string()));
            }
        }

        let row = self.fixture_row(home_team, away_team);
        let x = self.preprocessor.transform(std::slice::from_ref(&row))?;
        let (home_raw, away_raw) = self
            .model
            .predict(&x)?
            .first()
            .copied()
            .ok_or_else(|| FootballError::ShapeMismatch {
                expected: 1,
                found: 0,
            })?;

        let (home_goals, away_goals, outcome) = decide_scoreline(home_raw, away_raw);

        log::debug!(
            "{} vs {}: HF {:.2}, AF {:.2} -> raw {:.3} - {:.3}",
            home_team,
            away_team,
            row.home_form,
            row.away_form,
            home_raw,
            away_raw
        );

        Ok(Prediction {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals_raw: home_raw,
            away_goals_raw: away_raw,
            home_goals,
            away_goals,
            outcome,
            home_form: row.home_form,
            away_form: row.away_form,
        })
    }

    /// Feature row for a hypothetical fixture between the two teams
    pub fn fixture_row(&self, home_team: &str, away_team: &str) -> FeatureRow {
        let (home_form, away_form) = match self.policy {
            FormPolicy::Placeholder => self.placeholder_form,
            FormPolicy::History => (
                team_form(&self.history, home_team, Side::Home, self.window),
                team_form(&self.history, away_team, Side::Away, self.window),
            ),
        };

        let mut stats = MatchStats::default();
        for column in &self.preprocessor.numeric_columns {
            if let NumericColumn::Stat(kind) = column {
                let team = match kind.side() {
                    Side::Home => home_team,
                    Side::Away => away_team,
                };
                let value = team_stat_mean(&self.history, team, kind.side(), *kind, self.window);
                stats.set(*kind, value);
            }
        }

        FeatureRow::fixture(home_team, away_team, home_form, away_form).with_stats(stats)
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction) -> String {
    format!(
        "Predicted goals: {} {} - {} {}\nMatch prediction: {}",
        pred.home_team,
        pred.home_goals,
        pred.away_goals,
        pred.away_team,
        pred.outcome_label()
    )
}

pub fn render_prediction(pred: &Prediction, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_prediction(pred)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(pred)?),
    }
}

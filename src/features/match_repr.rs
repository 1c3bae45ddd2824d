//! Per-match feature rows

use serde::{Deserialize, Serialize};

use crate::data::MatchTable;
use crate::features::form::{rolling_form, FormOptions};
use crate::{FeatureConfig, MatchStats, Side, StatKind};

/// A numeric input column of the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericColumn {
    /// HF: home team's rolling home form
    HomeForm,
    /// AF: away team's rolling away form
    AwayForm,
    Stat(StatKind),
}

impl NumericColumn {
    /// Numeric columns selected by the feature configuration, in matrix order
    pub fn selected(include_match_stats: bool) -> Vec<NumericColumn> {
        let mut columns = vec![NumericColumn::HomeForm, NumericColumn::AwayForm];
        if include_match_stats {
            columns.extend(StatKind::ALL.iter().map(|k| NumericColumn::Stat(*k)));
        }
        columns
    }

    pub fn name(&self) -> &'static str {
        match self {
            NumericColumn::HomeForm => "HF",
            NumericColumn::AwayForm => "AF",
            NumericColumn::Stat(kind) => kind.column_name(),
        }
    }
}

/// Model input before encoding: the two team names plus numeric values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub home_team: String,
    pub away_team: String,
    pub home_form: f32,
    pub away_form: f32,
    pub stats: MatchStats,
}

impl FeatureRow {
    /// A hypothetical fixture with the given form values
    pub fn fixture(home_team: &str, away_team: &str, home_form: f32, away_form: f32) -> Self {
        FeatureRow {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_form,
            away_form,
            stats: MatchStats::default(),
        }
    }

    pub fn with_stats(mut self, stats: MatchStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn numeric(&self, column: NumericColumn) -> f32 {
        match column {
            NumericColumn::HomeForm => self.home_form,
            NumericColumn::AwayForm => self.away_form,
            NumericColumn::Stat(kind) => self.stats.get(kind),
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }
}

/// Engineered rows plus regression targets, aligned with the table
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub rows: Vec<FeatureRow>,
    /// FTHG per row
    pub home_goals: Vec<f32>,
    /// FTAG per row
    pub away_goals: Vec<f32>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Subset by row indices, in the given order
    pub fn select(&self, indices: &[usize]) -> FeatureSet {
        FeatureSet {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            home_goals: indices.iter().map(|&i| self.home_goals[i]).collect(),
            away_goals: indices.iter().map(|&i| self.away_goals[i]).collect(),
        }
    }
}

/// Compute HF/AF for every row of the table (in table order) and collect
/// the targets.
pub fn engineer_features(table: &MatchTable, config: &FeatureConfig) -> FeatureSet {
    let options = FormOptions::from(config);
    let records = table.records();

    let home_form = rolling_form(records, Side::Home, &options);
    let away_form = rolling_form(records, Side::Away, &options);

    let rows = records
        .iter()
        .zip(home_form.iter().zip(away_form.iter()))
        .map(|(m, (hf, af))| FeatureRow {
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            home_form: *hf,
            away_form: *af,
            stats: m.stats,
        })
        .collect();

    FeatureSet {
        rows,
        home_goals: records.iter().map(|m| m.home_goals as f32).collect(),
        away_goals: records.iter().map(|m| m.away_goals as f32).collect(),
    }
}

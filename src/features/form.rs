//! Rolling form computation
//!
//! Form is the mean goal difference (FTHG - FTAG) over a team's recent
//! matches on one side of the fixture.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::data::MatchTable;
use crate::{FeatureConfig, MatchRecord, Side, StatKind};

/// Which matches the rolling window covers for a given row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAnchor {
    /// The current row and the `window - 1` before it
    Trailing,
    /// The `window` rows strictly before the current one
    Prior,
}

#[derive(Debug, Clone, Copy)]
pub struct FormOptions {
    pub window: usize,
    pub anchor: WindowAnchor,
}

impl Default for FormOptions {
    fn default() -> Self {
        FormOptions {
            window: 5,
            anchor: WindowAnchor::Trailing,
        }
    }
}

impl From<&FeatureConfig> for FormOptions {
    fn from(config: &FeatureConfig) -> Self {
        FormOptions {
            window: config.form_window,
            anchor: config.window_anchor,
        }
    }
}

/// Per-row rolling form for the team on `side`.
///
/// Windows are per team and follow row order. Rows whose window is not yet
/// full get 0.0.
pub fn rolling_form(records: &[MatchRecord], side: Side, options: &FormOptions) -> Vec<f32> {
    let window = options.window.max(1);
    let mut history: HashMap<&str, VecDeque<f32>> = HashMap::new();
    let mut form = Vec::with_capacity(records.len());

    for record in records {
        let recent = history.entry(record.team(side)).or_default();
        let diff = record.goal_difference() as f32;

        if options.anchor == WindowAnchor::Trailing {
            push_bounded(recent, diff, window);
        }

        form.push(if recent.len() == window {
            recent.iter().sum::<f32>() / window as f32
        } else {
            0.0
        });

        if options.anchor == WindowAnchor::Prior {
            push_bounded(recent, diff, window);
        }
    }

    form
}

fn push_bounded(recent: &mut VecDeque<f32>, value: f32, window: usize) {
    recent.push_back(value);
    if recent.len() > window {
        recent.pop_front();
    }
}

/// Current form of a team for a new fixture.
///
/// Mean goal difference over the team's last `window` appearances on
/// `side`, or over all of them when there are fewer. A team that never
/// played on that side has form 0.0.
pub fn team_form(table: &MatchTable, team: &str, side: Side, window: usize) -> f32 {
    recent_mean(table, team, side, window, |m| m.goal_difference() as f32)
}

/// Recent mean of one match statistic for a team, with the same window
/// rules as [`team_form`]
pub fn team_stat_mean(
    table: &MatchTable,
    team: &str,
    side: Side,
    kind: StatKind,
    window: usize,
) -> f32 {
    recent_mean(table, team, side, window, |m| m.stats.get(kind))
}

fn recent_mean<F>(table: &MatchTable, team: &str, side: Side, window: usize, value: F) -> f32
where
    F: Fn(&MatchRecord) -> f32,
{
    let values: Vec<f32> = table.appearances(team, side).map(value).collect();
    if values.is_empty() {
        return 0.0;
    }
    let recent = &values[values.len().saturating_sub(window.max(1))..];
    recent.iter().sum::<f32>() / recent.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStats;

    fn make_match(home: &str, away: &str, home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord {
            date: None,
            season: "test".to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_goals,
            away_goals,
            stats: MatchStats::default(),
        }
    }

    /// Six home matches for "A" with goal differences [1, -1, 2, 0, 3, -2]
    fn six_home_matches() -> Vec<MatchRecord> {
        vec![
            make_match("A", "B", 2, 1),
            make_match("A", "C", 0, 1),
            make_match("A", "D", 3, 1),
            make_match("A", "E", 1, 1),
            make_match("A", "F", 3, 0),
            make_match("A", "G", 0, 2),
        ]
    }

    #[test]
    fn test_trailing_window_includes_current_row() {
        let form = rolling_form(&six_home_matches(), Side::Home, &FormOptions::default());

        assert_eq!(&form[..4], &[0.0, 0.0, 0.0, 0.0]);
        assert!((form[4] - 1.0).abs() < 1e-6);
        // Differences 2..=6: (-1 + 2 + 0 + 3 - 2) / 5
        assert!((form[5] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_prior_window_excludes_current_row() {
        let options = FormOptions {
            window: 5,
            anchor: WindowAnchor::Prior,
        };
        let form = rolling_form(&six_home_matches(), Side::Home, &options);

        assert_eq!(&form[..5], &[0.0; 5]);
        assert!((form[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_away_only_team_has_zero_home_form() {
        let records = six_home_matches();
        let home_form = rolling_form(&records, Side::Home, &FormOptions::default());
        let away_form = rolling_form(&records, Side::Away, &FormOptions::default());

        // B..G appear once each as away team; their windows never fill
        assert!(away_form.iter().all(|f| *f == 0.0));
        assert_eq!(home_form.len(), records.len());
    }

    #[test]
    fn test_windows_are_per_team() {
        let mut records = six_home_matches();
        records.insert(2, make_match("Z", "A", 5, 0));
        let form = rolling_form(&records, Side::Home, &FormOptions::default());

        // Z's row does not enter A's window
        assert_eq!(form[2], 0.0);
        assert!((form[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_team_form_for_fixture() {
        let table = MatchTable::new(six_home_matches());

        // Last five home games for A
        assert!((team_form(&table, "A", Side::Home, 5) - 0.4).abs() < 1e-6);
        // Fewer than five: overall mean (B played once away, difference 1)
        assert!((team_form(&table, "B", Side::Away, 5) - 1.0).abs() < 1e-6);
        // Never played at home
        assert_eq!(team_form(&table, "B", Side::Home, 5), 0.0);
    }

    #[test]
    fn test_team_stat_mean() {
        let mut records = six_home_matches();
        for (i, m) in records.iter_mut().enumerate() {
            m.stats.home_shots = i as f32;
        }
        let table = MatchTable::new(records);

        // Shots 1..=5 over the last five home games
        assert!((team_stat_mean(&table, "A", Side::Home, StatKind::HS, 5) - 3.0).abs() < 1e-6);
    }
}

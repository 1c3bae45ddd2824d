//! Concatenated match table

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::{MatchRecord, Outcome, Side};

/// Append-only table of historical matches, in source row order
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    records: Vec<MatchRecord>,
}

/// Summary numbers for `data status`
#[derive(Debug, Clone)]
pub struct TableStats {
    pub match_count: usize,
    pub team_count: usize,
    pub seasons: Vec<String>,
    pub earliest_match: Option<NaiveDate>,
    pub latest_match: Option<NaiveDate>,
    pub home_wins: usize,
    pub draws: usize,
    pub away_wins: usize,
}

impl MatchTable {
    pub fn new(records: Vec<MatchRecord>) -> Self {
        MatchTable { records }
    }

    /// Concatenate season tables preserving order; duplicates are kept
    pub fn concat(seasons: Vec<Vec<MatchRecord>>) -> Self {
        MatchTable {
            records: seasons.into_iter().flatten().collect(),
        }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the team appears anywhere in the table, home or away
    pub fn contains_team(&self, team: &str) -> bool {
        self.records.iter().any(|m| m.involves(team))
    }

    /// Sorted unique team names
    pub fn teams(&self) -> Vec<String> {
        let teams: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(|m| [m.home_team.as_str(), m.away_team.as_str()])
            .collect();
        teams.into_iter().map(str::to_string).collect()
    }

    /// Matches the team played on the given side, in table order
    pub fn appearances<'a>(
        &'a self,
        team: &'a str,
        side: Side,
    ) -> impl Iterator<Item = &'a MatchRecord> + 'a {
        self.records.iter().filter(move |m| m.team(side) == team)
    }

    /// True when dated rows never go backwards in time
    pub fn is_chronological(&self) -> bool {
        let dates: Vec<NaiveDate> = self.records.iter().filter_map(|m| m.date).collect();
        dates.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort by date; undated rows keep their relative order at the end
    pub fn sorted_chronologically(mut self) -> Self {
        self.records.sort_by_key(|m| (m.date.is_none(), m.date));
        self
    }

    pub fn stats(&self) -> TableStats {
        let mut seasons: Vec<String> = Vec::new();
        for m in &self.records {
            if !seasons.contains(&m.season) {
                seasons.push(m.season.clone());
            }
        }

        let count = |outcome: Outcome| self.records.iter().filter(|m| m.outcome() == outcome).count();

        TableStats {
            match_count: self.records.len(),
            team_count: self.teams().len(),
            seasons,
            earliest_match: self.records.iter().filter_map(|m| m.date).min(),
            latest_match: self.records.iter().filter_map(|m| m.date).max(),
            home_wins: count(Outcome::HomeWin),
            draws: count(Outcome::Draw),
            away_wins: count(Outcome::AwayWin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStats;

    fn make_match(date: Option<(i32, u32, u32)>, season: &str, home: &str, away: &str) -> MatchRecord {
        MatchRecord {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            season: season.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_goals: 1,
            away_goals: 0,
            stats: MatchStats::default(),
        }
    }

    #[test]
    fn test_concat_preserves_order_and_duplicates() {
        let newer = vec![make_match(Some((2024, 8, 16)), "2425", "Arsenal", "Wolves")];
        let older = vec![
            make_match(Some((2023, 8, 11)), "2324", "Burnley", "Man City"),
            make_match(Some((2023, 8, 11)), "2324", "Burnley", "Man City"),
        ];
        let table = MatchTable::concat(vec![newer, older]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0].season, "2425");
        assert!(!table.is_chronological());
        assert_eq!(table.stats().seasons, vec!["2425", "2324"]);
    }

    #[test]
    fn test_chronological_sort_is_stable() {
        let table = MatchTable::new(vec![
            make_match(Some((2024, 8, 16)), "2425", "Arsenal", "Wolves"),
            make_match(None, "2425", "Fulham", "Spurs"),
            make_match(Some((2023, 8, 11)), "2324", "Burnley", "Man City"),
            make_match(Some((2023, 8, 11)), "2324", "Chelsea", "Liverpool"),
        ])
        .sorted_chronologically();

        let homes: Vec<&str> = table.records().iter().map(|m| m.home_team.as_str()).collect();
        assert_eq!(homes, vec!["Burnley", "Chelsea", "Arsenal", "Fulham"]);
        assert!(table.is_chronological());
    }

    #[test]
    fn test_team_lookup() {
        let table = MatchTable::new(vec![
            make_match(None, "s", "Arsenal", "Wolves"),
            make_match(None, "s", "Wolves", "Brentford"),
        ]);

        assert!(table.contains_team("Brentford"));
        assert!(!table.contains_team("Real Madrid"));
        assert_eq!(table.teams(), vec!["Arsenal", "Brentford", "Wolves"]);
        assert_eq!(table.appearances("Wolves", Side::Home).count(), 1);
        assert_eq!(table.appearances("Wolves", Side::Away).count(), 1);
    }

    #[test]
    fn test_stats_count_results() {
        let mut draw = make_match(None, "s", "Wolves", "Brentford");
        draw.away_goals = 1;
        let mut away_win = make_match(None, "s", "Brentford", "Arsenal");
        away_win.away_goals = 3;
        let table = MatchTable::new(vec![make_match(None, "s", "Arsenal", "Wolves"), draw, away_win]);

        let stats = table.stats();
        assert_eq!((stats.home_wins, stats.draws, stats.away_wins), (1, 1, 1));
    }
}

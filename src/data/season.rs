//! Parsing of football-data.co.uk season files

use std::io::Cursor;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::{FootballError, MatchRecord, MatchStats, Result, StatKind};

const REQUIRED_COLUMNS: [&str; 4] = ["HomeTeam", "AwayTeam", "FTHG", "FTAG"];

/// Parse the raw bytes of one season CSV into match records.
///
/// Rows without team names (blank trailing lines) are skipped. Missing
/// stat columns and blank numeric cells read as zero.
pub fn parse_season_csv(bytes: Vec<u8>, source_id: &str) -> Result<Vec<MatchRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_ignore_errors(true)
        .map_parse_options(|opts| {
            opts.with_truncate_ragged_lines(true)
                .with_encoding(CsvEncoding::LossyUtf8)
        })
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| FootballError::SourceUnavailable {
            source_id: source_id.to_string(),
            message: format!("malformed CSV: {}", e),
        })?;

    for column in REQUIRED_COLUMNS {
        if df.get_column_index(column).is_none() {
            return Err(FootballError::SourceUnavailable {
                source_id: source_id.to_string(),
                message: format!("missing column {}", column),
            });
        }
    }

    let home_teams = text_column(&df, "HomeTeam")?.unwrap_or_default();
    let away_teams = text_column(&df, "AwayTeam")?.unwrap_or_default();
    let home_goals = numeric_column(&df, "FTHG")?.unwrap_or_default();
    let away_goals = numeric_column(&df, "FTAG")?.unwrap_or_default();
    let dates = text_column(&df, "Date")?;

    let mut stat_columns = Vec::with_capacity(StatKind::ALL.len());
    for kind in StatKind::ALL {
        stat_columns.push((kind, numeric_column(&df, kind.column_name())?));
    }

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for i in 0..df.height() {
        let (home_team, away_team) = match (&home_teams[i], &away_teams[i]) {
            (Some(h), Some(a)) if !h.is_empty() && !a.is_empty() => (h.clone(), a.clone()),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let mut stats = MatchStats::default();
        for (kind, values) in &stat_columns {
            if let Some(values) = values {
                stats.set(*kind, values[i] as f32);
            }
        }

        let date = dates
            .as_ref()
            .and_then(|d| d[i].as_deref())
            .and_then(parse_date);

        records.push(MatchRecord {
            date,
            season: source_id.to_string(),
            home_team,
            away_team,
            home_goals: goals(home_goals[i]),
            away_goals: goals(away_goals[i]),
            stats,
        });
    }

    if skipped > 0 {
        log::debug!("Skipped {} rows without team names in {}", skipped, source_id);
    }
    log::info!("Parsed {} matches from {}", records.len(), source_id);

    Ok(records)
}

/// Parse `dd/mm/yyyy` or `dd/mm/yy`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let year_len = text.rsplit('/').next().map(str::len)?;
    let format = if year_len == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
    NaiveDate::parse_from_str(text, format).ok()
}

fn goals(value: f64) -> u8 {
    value.clamp(0.0, u8::MAX as f64) as u8
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Option<Vec<f64>>> {
    if df.get_column_index(name).is_none() {
        return Ok(None);
    }
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
        .collect();
    Ok(Some(values))
}

fn text_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    if df.get_column_index(name).is_none() {
        return Ok(None);
    }
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect();
    Ok(Some(values))
}

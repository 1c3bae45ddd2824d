//! Feature encoding
//!
//! The [`Preprocessor`] standardises the numeric columns and one-hot encodes
//! the two team names. Scaling statistics and the team vocabulary are
//! learned once by [`Preprocessor::fit_transform`] and reused unchanged by
//! every later [`Preprocessor::transform`].

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::match_repr::{FeatureRow, NumericColumn};
use crate::{FootballError, Result, Side};

/// Dense row-major feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(FootballError::ShapeMismatch {
                expected: rows * cols,
                found: data.len(),
            });
        }
        Ok(FeatureMatrix { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy of the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        FeatureMatrix {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }
}

/// Z-score scaling with statistics from the fit data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population standard deviation; 1.0 for constant columns
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(columns: &[Vec<f32>]) -> Self {
        let mut mean = Vec::with_capacity(columns.len());
        let mut scale = Vec::with_capacity(columns.len());

        for values in columns {
            let n = values.len().max(1) as f64;
            let m = values.iter().map(|v| *v as f64).sum::<f64>() / n;
            let variance = values
                .iter()
                .map(|v| (*v as f64 - m).powi(2))
                .sum::<f64>()
                / n;
            let std = variance.sqrt();
            mean.push(m);
            scale.push(if std > f64::EPSILON { std } else { 1.0 });
        }

        StandardScaler { mean, scale }
    }

    pub fn transform(&self, column: usize, value: f32) -> f32 {
        ((value as f64 - self.mean[column]) / self.scale[column]) as f32
    }
}

/// One-hot encoding over a fixed vocabulary; unknown values map to zeros
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted categories learned at fit time
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let categories: BTreeSet<&str> = values.collect();
        OneHotEncoder {
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Append the block for `value` to `out`
    pub fn encode_into(&self, value: &str, out: &mut Vec<f32>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        if let Some(i) = self.index_of(value) {
            out[start + i] = 1.0;
        }
    }
}

/// Fitted column transformer: `[scaled numeric | home one-hot | away one-hot]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub numeric_columns: Vec<NumericColumn>,
    pub scaler: StandardScaler,
    pub home_teams: OneHotEncoder,
    pub away_teams: OneHotEncoder,
}

impl Preprocessor {
    /// Learn scaling statistics and team vocabularies from `rows` and encode them
    pub fn fit_transform(
        rows: &[FeatureRow],
        numeric_columns: Vec<NumericColumn>,
    ) -> Result<(FeatureMatrix, Preprocessor)> {
        if rows.is_empty() {
            return Err(FootballError::FitFailure(
                "cannot fit preprocessor on an empty table".to_string(),
            ));
        }

        let columns: Vec<Vec<f32>> = numeric_columns
            .iter()
            .map(|c| rows.iter().map(|r| r.numeric(*c)).collect())
            .collect();

        let preprocessor = Preprocessor {
            scaler: StandardScaler::fit(&columns),
            home_teams: OneHotEncoder::fit(rows.iter().map(|r| r.team(Side::Home))),
            away_teams: OneHotEncoder::fit(rows.iter().map(|r| r.team(Side::Away))),
            numeric_columns,
        };

        log::debug!(
            "Fitted preprocessor: {} numeric, {} home teams, {} away teams",
            preprocessor.numeric_columns.len(),
            preprocessor.home_teams.width(),
            preprocessor.away_teams.width()
        );

        let matrix = preprocessor.transform(rows)?;
        Ok((matrix, preprocessor))
    }

    /// Encode rows with the fitted statistics and vocabularies
    pub fn transform(&self, rows: &[FeatureRow]) -> Result<FeatureMatrix> {
        for fitted in [self.scaler.mean.len(), self.scaler.scale.len()] {
            if fitted != self.numeric_columns.len() {
                return Err(FootballError::ShapeMismatch {
                    expected: self.numeric_columns.len(),
                    found: fitted,
                });
            }
        }

        let cols = self.output_dim();
        let mut data = Vec::with_capacity(rows.len() * cols);

        for row in rows {
            for (i, column) in self.numeric_columns.iter().enumerate() {
                data.push(self.scaler.transform(i, row.numeric(*column)));
            }
            self.home_teams.encode_into(&row.home_team, &mut data);
            self.away_teams.encode_into(&row.away_team, &mut data);
        }

        FeatureMatrix::new(rows.len(), cols, data)
    }

    /// Width of an encoded row
    pub fn output_dim(&self) -> usize {
        self.numeric_columns.len() + self.home_teams.width() + self.away_teams.width()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_rows() -> Vec<FeatureRow> {
        vec![
            FeatureRow::fixture("Arsenal", "Chelsea", 1.0, -1.0),
            FeatureRow::fixture("Chelsea", "Everton", 3.0, 1.0),
            FeatureRow::fixture("Everton", "Arsenal", 2.0, 0.0),
        ]
    }

    #[test]
    fn test_fit_transform_layout() {
        let (matrix, pre) =
            Preprocessor::fit_transform(&training_rows(), NumericColumn::selected(false)).unwrap();

        // 2 numeric + 3 home teams + 3 away teams
        assert_eq!(pre.output_dim(), 8);
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.cols(), 8);
        assert_eq!(pre.home_teams.categories, vec!["Arsenal", "Chelsea", "Everton"]);
        assert_eq!(pre.away_teams.categories, vec!["Arsenal", "Chelsea", "Everton"]);

        // HF mean 2, population std sqrt(2/3)
        let expected = (1.0 - 2.0) / (2.0f64 / 3.0).sqrt();
        assert!((matrix.get(0, 0) as f64 - expected).abs() < 1e-5);

        // Row 0: home Arsenal, away Chelsea
        assert_eq!(&matrix.row(0)[2..], &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_scaled_columns_have_zero_mean() {
        let (matrix, _) =
            Preprocessor::fit_transform(&training_rows(), NumericColumn::selected(false)).unwrap();
        for col in 0..2 {
            let mean: f32 = (0..matrix.rows()).map(|r| matrix.get(r, col)).sum::<f32>() / 3.0;
            assert!(mean.abs() < 1e-6);
        }
    }

    #[test]
    fn test_transform_reuses_fitted_statistics() {
        let rows = training_rows();
        let (matrix, pre) =
            Preprocessor::fit_transform(&rows, NumericColumn::selected(false)).unwrap();

        // Same row at inference encodes bit-identically
        let again = pre.transform(&rows[1..2]).unwrap();
        assert_eq!(again.row(0), matrix.row(1));

        // New data must not shift the statistics
        let shifted = vec![FeatureRow::fixture("Arsenal", "Chelsea", 100.0, 100.0)];
        pre.transform(&shifted).unwrap();
        let after = pre.transform(&rows[1..2]).unwrap();
        assert_eq!(after.row(0), matrix.row(1));
    }

    #[test]
    fn test_unknown_team_encodes_to_zeros() {
        let (_, pre) =
            Preprocessor::fit_transform(&training_rows(), NumericColumn::selected(false)).unwrap();

        let rows = vec![FeatureRow::fixture("Luton", "Chelsea", 2.0, 0.0)];
        let matrix = pre.transform(&rows).unwrap();

        assert_eq!(&matrix.row(0)[2..5], &[0.0, 0.0, 0.0]);
        assert_eq!(&matrix.row(0)[5..8], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_constant_column_uses_unit_scale() {
        let rows = vec![
            FeatureRow::fixture("A", "B", 1.5, 0.0),
            FeatureRow::fixture("B", "A", 1.5, 0.0),
        ];
        let (matrix, pre) =
            Preprocessor::fit_transform(&rows, NumericColumn::selected(false)).unwrap();

        assert_eq!(pre.scaler.scale, vec![1.0, 1.0]);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn test_empty_fit_fails() {
        let err = Preprocessor::fit_transform(&[], NumericColumn::selected(false)).unwrap_err();
        assert!(matches!(err, FootballError::FitFailure(_)));
    }

    #[test]
    fn test_save_and_load() {
        let (_, pre) =
            Preprocessor::fit_transform(&training_rows(), NumericColumn::selected(true)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");

        pre.save(&path).unwrap();
        let loaded = Preprocessor::load(&path).unwrap();

        assert_eq!(loaded, pre);
        assert_eq!(loaded.output_dim(), 12 + 6);
    }

    #[test]
    fn test_scaler_width_must_match_numeric_columns() {
        let (_, pre) =
            Preprocessor::fit_transform(&training_rows(), NumericColumn::selected(false)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");
        pre.save(&path).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["scaler"]["mean"] = serde_json::json!([0.0]);
        value["scaler"]["scale"] = serde_json::json!([1.0]);
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = Preprocessor::load(&path).unwrap();
        let err = loaded.transform(&training_rows()).unwrap_err();
        assert!(matches!(
            err,
            FootballError::ShapeMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_matrix_shape_check() {
        assert!(FeatureMatrix::new(2, 3, vec![0.0; 5]).is_err());
        let m = FeatureMatrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.select_rows(&[1, 0]).as_slice(), &[3.0, 4.0, 1.0, 2.0]);
    }
}

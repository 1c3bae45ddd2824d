//! Goal regressors
//!
//! Three interchangeable model families behind [`ScoreModel`]:
//! - MLP: burn network predicting both targets jointly
//! - Random forest: one bagged tree ensemble per target
//! - Gradient boosting: one boosted tree ensemble per target

pub mod boosting;
pub mod forest;
pub mod mlp;
pub mod tree;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::features::FeatureMatrix;
use crate::training::metrics::TrainingHistory;
use crate::{Config, FootballError, Result};

pub use boosting::GradientBoosting;
pub use forest::RandomForest;
pub use mlp::{MlpScoreModel, ScoreNet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Mlp,
    Forest,
    Boosting,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Mlp => "mlp",
            ModelKind::Forest => "forest",
            ModelKind::Boosting => "boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicts (home goals, away goals) for encoded fixture rows
pub trait ScoreModel {
    fn kind(&self) -> ModelKind;

    /// Width of the rows this model accepts
    fn input_dim(&self) -> usize;

    fn fit(&mut self, x: &FeatureMatrix, home_goals: &[f32], away_goals: &[f32]) -> Result<()>;

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<(f32, f32)>>;

    /// Write the fitted model into `dir`
    fn save(&self, dir: &Path) -> Result<()>;

    /// Per-epoch losses of the last fit, for models trained in epochs
    fn training_history(&self) -> Option<&TrainingHistory> {
        None
    }
}

/// Single-target regressor used by the tree ensembles
pub trait Regressor: Serialize + DeserializeOwned {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f32]) -> Result<()>;

    fn predict_row(&self, row: &[f32]) -> f32;

    fn is_fitted(&self) -> bool;

    fn predict(&self, x: &FeatureMatrix) -> Vec<f32> {
        (0..x.rows()).map(|i| self.predict_row(x.row(i))).collect()
    }
}

/// One independent regressor per target
#[derive(Debug, Clone)]
pub struct TargetPair<R: Regressor> {
    kind: ModelKind,
    input_dim: usize,
    pub home: R,
    pub away: R,
}

impl<R: Regressor> TargetPair<R> {
    pub fn new(kind: ModelKind, input_dim: usize, home: R, away: R) -> Self {
        TargetPair {
            kind,
            input_dim,
            home,
            away,
        }
    }

    /// Load both regressors; they must have been fitted on `input_dim` columns
    pub fn load(kind: ModelKind, dir: &Path, input_dim: usize) -> Result<Self> {
        let [home_path, away_path] = target_paths(kind, dir);
        let home: SavedRegressor<R> = read_json(&home_path)?;
        let away: SavedRegressor<R> = read_json(&away_path)?;
        check_saved_width(input_dim, home.input_dim)?;
        check_saved_width(input_dim, away.input_dim)?;
        Ok(TargetPair::new(kind, input_dim, home.regressor, away.regressor))
    }
}

/// On-disk form of one fitted regressor with the row width it was fitted on
#[derive(Serialize, Deserialize)]
struct SavedRegressor<R> {
    input_dim: usize,
    regressor: R,
}

impl<R: Regressor> ScoreModel for TargetPair<R> {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn fit(&mut self, x: &FeatureMatrix, home_goals: &[f32], away_goals: &[f32]) -> Result<()> {
        check_width(self.input_dim, x)?;
        log::info!("Fitting {} home-goals model on {} rows", self.kind, x.rows());
        self.home.fit(x, home_goals)?;
        log::info!("Fitting {} away-goals model on {} rows", self.kind, x.rows());
        self.away.fit(x, away_goals)?;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<(f32, f32)>> {
        check_width(self.input_dim, x)?;
        if !self.home.is_fitted() || !self.away.is_fitted() {
            return Err(FootballError::FitFailure(format!(
                "{} model used before fitting",
                self.kind
            )));
        }
        let home = self.home.predict(x);
        let away = self.away.predict(x);
        Ok(home.into_iter().zip(away).collect())
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let [home_path, away_path] = target_paths(self.kind, dir);
        for (path, regressor) in [(&home_path, &self.home), (&away_path, &self.away)] {
            let saved = SavedRegressor {
                input_dim: self.input_dim,
                regressor,
            };
            write_json(path, &saved)?;
        }
        log::info!(
            "Saved {} models to {} and {}",
            self.kind,
            home_path.display(),
            away_path.display()
        );
        Ok(())
    }
}

fn target_paths(kind: ModelKind, dir: &Path) -> [PathBuf; 2] {
    [
        dir.join(format!("home_goals_{}.json", kind)),
        dir.join(format!("away_goals_{}.json", kind)),
    ]
}

/// Files a saved model of this kind consists of
pub fn artifact_paths(kind: ModelKind, dir: &Path) -> Vec<PathBuf> {
    match kind {
        ModelKind::Mlp => vec![mlp::record_file(dir), mlp::shape_file(dir)],
        ModelKind::Forest | ModelKind::Boosting => target_paths(kind, dir).to_vec(),
    }
}

pub(crate) fn check_width(expected: usize, x: &FeatureMatrix) -> Result<()> {
    if x.cols() != expected {
        return Err(FootballError::ShapeMismatch {
            expected,
            found: x.cols(),
        });
    }
    Ok(())
}

/// A saved model only accepts rows as wide as the ones it was fitted on
pub(crate) fn check_saved_width(expected: usize, saved: usize) -> Result<()> {
    if saved != expected {
        return Err(FootballError::ShapeMismatch {
            expected,
            found: saved,
        });
    }
    Ok(())
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), value)?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Fresh, unfitted model of the given kind
pub fn build_model(kind: ModelKind, config: &Config, input_dim: usize) -> Box<dyn ScoreModel> {
    match kind {
        ModelKind::Mlp => Box::new(MlpScoreModel::new(config.mlp.clone(), input_dim)),
        ModelKind::Forest => Box::new(TargetPair::new(
            kind,
            input_dim,
            RandomForest::new(&config.forest),
            RandomForest::new(&config.forest),
        )),
        ModelKind::Boosting => Box::new(TargetPair::new(
            kind,
            input_dim,
            GradientBoosting::new(&config.boosting),
            GradientBoosting::new(&config.boosting),
        )),
    }
}

/// Load a previously saved model of the given kind from `dir`
pub fn load_model(
    kind: ModelKind,
    config: &Config,
    dir: &Path,
    input_dim: usize,
) -> Result<Box<dyn ScoreModel>> {
    if artifact_paths(kind, dir).iter().any(|p| !p.exists()) {
        return Err(FootballError::NoModel(dir.display().to_string()));
    }

    Ok(match kind {
        ModelKind::Mlp => Box::new(MlpScoreModel::load(config.mlp.clone(), dir, input_dim)?),
        ModelKind::Forest => Box::new(TargetPair::<RandomForest>::load(kind, dir, input_dim)?),
        ModelKind::Boosting => {
            Box::new(TargetPair::<GradientBoosting>::load(kind, dir, input_dim)?)
        }
    })
}

//! End-to-end fitting: features, split, preprocessing, model, evaluation

use std::path::{Path, PathBuf};

use crate::data::MatchTable;
use crate::features::{engineer_features, NumericColumn, Preprocessor};
use crate::model::{build_model, load_model, ModelKind, ScoreModel};
use crate::training::metrics::Evaluation;
use crate::training::split::train_test_split;
use crate::{Config, FeatureConfig, FootballError, Result};

/// Fitted preprocessor of a model kind; each kind keeps its own
pub fn preprocessor_file(kind: ModelKind, dir: &Path) -> PathBuf {
    dir.join(format!("preprocessor_{}.json", kind))
}

/// Apply the configured row ordering to a freshly loaded table
pub fn prepare_table(table: MatchTable, config: &FeatureConfig) -> MatchTable {
    if config.chronological_sort {
        log::info!("Sorting {} matches by date", table.len());
        table.sorted_chronologically()
    } else {
        if !table.is_chronological() {
            log::warn!(
                "Match table is not in date order; rolling form follows row order \
                 (set features.chronological_sort = true to sort)"
            );
        }
        table
    }
}

/// A fitted preprocessor and model with their test-split evaluation
pub struct TrainedPipeline {
    pub preprocessor: Preprocessor,
    pub model: Box<dyn ScoreModel>,
    pub evaluation: Evaluation,
    pub train_rows: usize,
}

impl TrainedPipeline {
    /// Write the preprocessor and model files into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.preprocessor.save(&preprocessor_file(self.model.kind(), dir))?;
        self.model.save(dir)?;
        Ok(())
    }
}

/// Trainer for any of the goal model families
pub struct Trainer<'a> {
    config: &'a Config,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Trainer { config }
    }

    /// Engineer features over `table`, split, fit the preprocessor and the
    /// model on the training rows, and evaluate on the test rows.
    pub fn train(&self, table: &MatchTable, kind: ModelKind) -> Result<TrainedPipeline> {
        if table.is_empty() {
            return Err(FootballError::FitFailure("no matches to train on".to_string()));
        }

        let features = engineer_features(table, &self.config.features);
        let split = train_test_split(
            features.len(),
            self.config.split.test_ratio,
            self.config.split.seed,
        );
        let train_set = features.select(&split.train);
        let test_set = features.select(&split.test);

        log::info!(
            "Split {} matches into {} train / {} test",
            features.len(),
            train_set.len(),
            test_set.len()
        );

        let numeric = NumericColumn::selected(self.config.features.include_match_stats);
        let (x_train, preprocessor) = Preprocessor::fit_transform(&train_set.rows, numeric)?;
        let x_test = preprocessor.transform(&test_set.rows)?;

        log::info!(
            "Encoded {} features ({} numeric)",
            preprocessor.output_dim(),
            preprocessor.numeric_columns.len()
        );

        let mut model = build_model(kind, self.config, preprocessor.output_dim());
        model.fit(&x_train, &train_set.home_goals, &train_set.away_goals)?;

        let predictions = model.predict(&x_test)?;
        let evaluation =
            Evaluation::compute(&predictions, &test_set.home_goals, &test_set.away_goals)?;

        log::info!(
            "{} test MSE: home {:.4}, away {:.4}",
            kind,
            evaluation.home.mse,
            evaluation.away.mse
        );

        Ok(TrainedPipeline {
            preprocessor,
            model,
            evaluation,
            train_rows: train_set.len(),
        })
    }
}

/// Load the preprocessor and a model of `kind` saved by [`TrainedPipeline::save`]
pub fn load_artifacts(
    kind: ModelKind,
    config: &Config,
    dir: &Path,
) -> Result<(Preprocessor, Box<dyn ScoreModel>)> {
    let preprocessor_path = preprocessor_file(kind, dir);
    if !preprocessor_path.exists() {
        return Err(FootballError::NoModel(dir.display().to_string()));
    }

    let preprocessor = Preprocessor::load(&preprocessor_path)?;
    let model = load_model(kind, config, dir, preprocessor.output_dim())?;
    Ok((preprocessor, model))
}

//! Training metrics and evaluation

use std::fmt;

use serde::Serialize;

use crate::{FootballError, Outcome, Result};

/// Squared-error summary for one target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    pub fn compute(predicted: &[f32], actual: &[f32]) -> Result<Self> {
        if predicted.len() != actual.len() {
            return Err(FootballError::ShapeMismatch {
                expected: actual.len(),
                found: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Ok(Self::default());
        }

        let n = actual.len() as f64;
        let (sq, abs) = predicted
            .iter()
            .zip(actual)
            .fold((0.0f64, 0.0f64), |(sq, abs), (p, a)| {
                let err = (*p - *a) as f64;
                (sq + err * err, abs + err.abs())
            });

        let mse = sq / n;
        Ok(RegressionMetrics {
            mse,
            rmse: mse.sqrt(),
            mae: abs / n,
        })
    }
}

/// Test-split evaluation of a goal model
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub samples: usize,
    pub home: RegressionMetrics,
    pub away: RegressionMetrics,
    /// Both targets pooled
    pub combined: RegressionMetrics,
    /// Share of rows whose rounded scoreline gives the actual result
    pub outcome_accuracy: f64,
}

impl Evaluation {
    pub fn compute(predictions: &[(f32, f32)], home_goals: &[f32], away_goals: &[f32]) -> Result<Self> {
        let home_pred: Vec<f32> = predictions.iter().map(|p| p.0).collect();
        let away_pred: Vec<f32> = predictions.iter().map(|p| p.1).collect();

        let home = RegressionMetrics::compute(&home_pred, home_goals)?;
        let away = RegressionMetrics::compute(&away_pred, away_goals)?;

        let pooled_pred: Vec<f32> = home_pred.iter().chain(&away_pred).copied().collect();
        let pooled_actual: Vec<f32> = home_goals.iter().chain(away_goals).copied().collect();
        let combined = RegressionMetrics::compute(&pooled_pred, &pooled_actual)?;

        let correct = predictions
            .iter()
            .zip(home_goals.iter().zip(away_goals))
            .filter(|((ph, pa), (ah, aa))| {
                Outcome::decide(ph.round_ties_even() as i32, pa.round_ties_even() as i32)
                    == Outcome::decide(**ah as i32, **aa as i32)
            })
            .count();

        Ok(Evaluation {
            samples: predictions.len(),
            home,
            away,
            combined,
            outcome_accuracy: if predictions.is_empty() {
                0.0
            } else {
                correct as f64 / predictions.len() as f64
            },
        })
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean Squared Error (Home Goals): {:.4}", self.home.mse)?;
        writeln!(f, "Mean Squared Error (Away Goals): {:.4}", self.away.mse)?;
        writeln!(f, "Root Mean Squared Error (Home Goals): {:.4}", self.home.rmse)?;
        writeln!(f, "Root Mean Squared Error (Away Goals): {:.4}", self.away.rmse)?;
        writeln!(
            f,
            "Combined MSE: {:.4} | MAE: {:.4}",
            self.combined.mse, self.combined.mae
        )?;
        write!(
            f,
            "Outcome accuracy: {:.1}% over {} test matches",
            self.outcome_accuracy * 100.0,
            self.samples
        )
    }
}

/// Per-epoch loss history for the neural model
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record losses for an epoch; `val_loss` is absent without a validation split
    pub fn record_epoch(&mut self, epoch: usize, train_loss: f64, val_loss: Option<f64>) {
        self.train_losses.push(train_loss);

        if let Some(val_loss) = val_loss {
            self.val_losses.push(val_loss);
            if val_loss < self.best_val_loss {
                self.best_val_loss = val_loss;
                self.best_epoch = epoch;
            }
        }
    }

    /// Best validation loss and its epoch, if any epoch was validated
    pub fn best(&self) -> Option<(usize, f64)> {
        (!self.val_losses.is_empty()).then_some((self.best_epoch, self.best_val_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_metrics() {
        let m = RegressionMetrics::compute(&[1.0, 2.0, 4.0], &[1.0, 3.0, 2.0]).unwrap();
        // Errors 0, -1, 2
        assert!((m.mse - 5.0 / 3.0).abs() < 1e-9);
        assert!((m.rmse - (5.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!((m.mae - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(RegressionMetrics::compute(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_evaluation() {
        let predictions = [(2.4, 0.6), (1.0, 1.4), (0.2, 2.0)];
        let home = [2.0, 0.0, 1.0];
        let away = [1.0, 0.0, 1.0];
        let eval = Evaluation::compute(&predictions, &home, &away).unwrap();

        assert_eq!(eval.samples, 3);
        // Home win and draw match, the third predicts an away win on a draw
        assert!((eval.outcome_accuracy - 2.0 / 3.0).abs() < 1e-9);

        let pooled = (eval.home.mse + eval.away.mse) / 2.0;
        assert!((eval.combined.mse - pooled).abs() < 1e-6);
    }

    #[test]
    fn test_history_tracks_best_epoch() {
        let mut history = TrainingHistory::new();
        history.record_epoch(0, 2.0, Some(1.5));
        history.record_epoch(1, 1.0, Some(1.2));
        history.record_epoch(2, 0.8, Some(1.3));

        assert_eq!(history.best_epoch, 1);
        assert_eq!(history.best_val_loss, 1.2);
        assert_eq!(history.best(), Some((1, 1.2)));

        let mut unvalidated = TrainingHistory::new();
        unvalidated.record_epoch(0, 2.0, None);
        assert_eq!(unvalidated.best(), None);
    }

    #[test]
    fn test_evaluation_report() {
        let eval = Evaluation::compute(&[(2.0, 1.0), (1.0, 1.0)], &[2.0, 0.0], &[1.0, 1.0]).unwrap();
        let report = eval.to_string();

        assert!(report.starts_with("Mean Squared Error (Home Goals): 0.5000\n"));
        assert!(report.contains("Root Mean Squared Error (Away Goals): 0.0000"));
        assert!(report.contains("MAE: 0.2500"));
        assert!(report.ends_with("Outcome accuracy: 50.0% over 2 test matches"));
    }
}

//! Training loop for the MLP goal regressor

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::features::FeatureMatrix;
use crate::model::mlp::{ScoreNet, ScoreNetConfig};
use crate::training::metrics::TrainingHistory;
use crate::{FootballError, MlpConfig, Result};

/// One encoded fixture with its two targets
#[derive(Debug, Clone)]
pub struct GoalSample {
    pub features: Vec<f32>,
    /// [home goals, away goals]
    pub targets: [f32; 2],
}

pub struct GoalDataset {
    samples: Vec<GoalSample>,
}

impl GoalDataset {
    /// Samples for rows `start..end` of the matrix
    pub fn from_rows(
        x: &FeatureMatrix,
        home_goals: &[f32],
        away_goals: &[f32],
        rows: std::ops::Range<usize>,
    ) -> Self {
        let samples = rows
            .map(|i| GoalSample {
                features: x.row(i).to_vec(),
                targets: [home_goals[i], away_goals[i]],
            })
            .collect();
        GoalDataset { samples }
    }
}

impl Dataset<GoalSample> for GoalDataset {
    fn get(&self, index: usize) -> Option<GoalSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Clone)]
pub struct GoalBatch<B: Backend> {
    /// [batch, input_dim]
    pub features: Tensor<B, 2>,
    /// [batch, 2]
    pub targets: Tensor<B, 2>,
}

/// Batcher for creating training batches
#[derive(Clone)]
pub struct GoalBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> GoalBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        GoalBatcher { device }
    }
}

impl<B: Backend> Batcher<B, GoalSample, GoalBatch<B>> for GoalBatcher<B> {
    fn batch(&self, items: Vec<GoalSample>, _device: &B::Device) -> GoalBatch<B> {
        let batch_size = items.len();
        let input_dim = items.first().map(|s| s.features.len()).unwrap_or(0);

        let mut feature_data = Vec::with_capacity(batch_size * input_dim);
        let mut target_data = Vec::with_capacity(batch_size * 2);
        for sample in &items {
            feature_data.extend_from_slice(&sample.features);
            target_data.extend_from_slice(&sample.targets);
        }

        let features = Tensor::<B, 1>::from_floats(feature_data.as_slice(), &self.device)
            .reshape([batch_size, input_dim]);
        let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), &self.device)
            .reshape([batch_size, 2]);

        GoalBatch { features, targets }
    }
}

/// Trainer for the MLP model
pub struct MlpTrainer<B: AutodiffBackend> {
    model: ScoreNet<B>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<burn::optim::Adam, ScoreNet<B>, B>,
    loss_fn: MseLoss,
    config: MlpConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> MlpTrainer<B> {
    /// Create a new trainer; seeds the backend so initial weights and
    /// dropout masks are reproducible
    pub fn new(net_config: &ScoreNetConfig, config: &MlpConfig, device: B::Device) -> Self {
        B::seed(config.seed);

        MlpTrainer {
            model: ScoreNet::new(&device, net_config),
            optimizer: AdamConfig::new().init(),
            loss_fn: MseLoss::new(),
            config: config.clone(),
            device,
        }
    }

    /// Fit on all rows except the trailing validation fraction. Returns the
    /// model after the final epoch.
    pub fn train(
        mut self,
        x: &FeatureMatrix,
        home_goals: &[f32],
        away_goals: &[f32],
    ) -> Result<(ScoreNet<B>, TrainingHistory)> {
        let n = x.rows();
        if n == 0 || home_goals.len() != n || away_goals.len() != n {
            return Err(FootballError::FitFailure(format!(
                "mlp needs matching non-empty inputs ({} rows, {} / {} targets)",
                n,
                home_goals.len(),
                away_goals.len()
            )));
        }

        let n_train = ((n as f64 * (1.0 - self.config.validation_split)) as usize).clamp(1, n);
        let train_dataset = GoalDataset::from_rows(x, home_goals, away_goals, 0..n_train);
        let val_dataset = GoalDataset::from_rows(x, home_goals, away_goals, n_train..n);
        let has_validation = val_dataset.len() > 0;

        log::info!(
            "MLP training on {} rows, validating on {}",
            train_dataset.len(),
            val_dataset.len()
        );

        let batch_size = self.config.batch_size.max(1);
        let train_loader = DataLoaderBuilder::new(GoalBatcher::<B>::new(self.device.clone()))
            .batch_size(batch_size)
            .shuffle(self.config.seed)
            .build(train_dataset);

        let val_loader =
            DataLoaderBuilder::new(GoalBatcher::<B::InnerBackend>::new(self.device.clone()))
                .batch_size(batch_size)
                .build(val_dataset);

        let mut history = TrainingHistory::new();

        for epoch in 0..self.config.epochs {
            let train_loss = self.train_epoch(train_loader.iter());
            let val_loss = has_validation.then(|| self.validate_epoch(val_loader.iter()));

            history.record_epoch(epoch, train_loss, val_loss);

            match val_loss {
                Some(val_loss) => log::info!(
                    "Epoch {}/{}: loss {:.4} | val_loss {:.4}",
                    epoch + 1,
                    self.config.epochs,
                    train_loss,
                    val_loss
                ),
                None => log::info!(
                    "Epoch {}/{}: loss {:.4}",
                    epoch + 1,
                    self.config.epochs,
                    train_loss
                ),
            }

            if !train_loss.is_finite() {
                return Err(FootballError::FitFailure(format!(
                    "mlp loss diverged at epoch {}",
                    epoch + 1
                )));
            }
        }

        Ok((self.model, history))
    }

    /// Train one epoch; returns the sample-weighted mean loss
    fn train_epoch(&mut self, loader: impl Iterator<Item = GoalBatch<B>>) -> f64 {
        let mut total = 0.0f64;
        let mut count = 0usize;

        for batch in loader {
            let batch_size = batch.features.dims()[0];

            let output = self.model.forward(batch.features);
            let loss = self
                .loss_fn
                .forward(output, batch.targets, Reduction::Mean);

            let loss_val: f32 = loss.clone().into_scalar().elem();

            // Backward pass
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);

            // Update weights
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            total += loss_val as f64 * batch_size as f64;
            count += batch_size;
        }

        total / count.max(1) as f64
    }

    /// Validation loss with dropout disabled
    fn validate_epoch(&self, loader: impl Iterator<Item = GoalBatch<B::InnerBackend>>) -> f64 {
        let model = self.model.valid();
        let mut total = 0.0f64;
        let mut count = 0usize;

        for batch in loader {
            let batch_size = batch.features.dims()[0];
            let output = model.forward(batch.features);
            let loss = self
                .loss_fn
                .forward(output, batch.targets, Reduction::Mean);
            let loss_val: f32 = loss.into_scalar().elem();

            total += loss_val as f64 * batch_size as f64;
            count += batch_size;
        }

        total / count.max(1) as f64
    }
}

//! Feed-forward goal regressor
//!
//! Architecture: Input → Hidden(128) → ReLU → Dropout(0.3)
//!                     → Hidden(64)  → ReLU → Dropout(0.2)
//!                     → Hidden(32)  → ReLU
//!                     → Linear(2) = (home goals, away goals)

use std::path::{Path, PathBuf};

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::features::FeatureMatrix;
use crate::model::{check_saved_width, check_width, read_json, write_json, ModelKind, ScoreModel};
use crate::training::metrics::TrainingHistory;
use crate::training::mlp_trainer::MlpTrainer;
use crate::{FootballError, MlpConfig, Result};

/// Backend used for inference and saved weights
pub type InferenceBackend = NdArray<f32>;
/// Backend used while fitting
pub type TrainingBackend = Autodiff<InferenceBackend>;

/// Record file name, without the `.mpk` extension the recorder appends
const RECORD_NAME: &str = "mlp_score_predictor";

/// Configuration for the network shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreNetConfig {
    pub input_dim: usize,
    pub hidden_dims: Vec<usize>,
    /// Dropout after hidden layer `i`; layers past the end get none
    pub dropouts: Vec<f64>,
}

impl ScoreNetConfig {
    pub fn new(input_dim: usize, config: &MlpConfig) -> Self {
        ScoreNetConfig {
            input_dim,
            hidden_dims: config.hidden_dims.clone(),
            dropouts: config.dropouts.clone(),
        }
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct ScoreNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> ScoreNet<B> {
    pub fn new(device: &B::Device, config: &ScoreNetConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for (i, &out_dim) in config.hidden_dims.iter().enumerate() {
            let dropout = config.dropouts.get(i).copied().unwrap_or(0.0);
            hidden.push(HiddenBlock::new(device, in_dim, out_dim, dropout));
            in_dim = out_dim;
        }

        ScoreNet {
            hidden,
            output: LinearConfig::new(in_dim, 2).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Encoded fixtures [batch, input_dim]
    ///
    /// # Returns
    /// Goal predictions [batch, 2], home then away
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.iter().fold(x, |x, block| block.forward(x));
        self.output.forward(x)
    }

    /// Save model to file
    pub fn save(&self, path: PathBuf) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path)
            .map_err(|e| FootballError::Io(std::io::Error::other(e.to_string())))
    }

    /// Load model from file
    pub fn load(device: &B::Device, path: PathBuf, config: &ScoreNetConfig) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path, device)
            .map_err(|e| FootballError::Io(std::io::Error::other(e.to_string())))?;

        Ok(Self::new(device, config).load_record(record))
    }
}

/// On-disk location of the MLP record inside a model directory
pub fn record_file(dir: &Path) -> PathBuf {
    dir.join(format!("{}.mpk", RECORD_NAME))
}

/// Network shape saved next to the record
pub fn shape_file(dir: &Path) -> PathBuf {
    dir.join(format!("{}.json", RECORD_NAME))
}

/// [`ScoreModel`] wrapper around [`ScoreNet`]
pub struct MlpScoreModel {
    config: MlpConfig,
    net_config: ScoreNetConfig,
    device: <InferenceBackend as Backend>::Device,
    net: Option<ScoreNet<InferenceBackend>>,
    history: Option<TrainingHistory>,
}

impl MlpScoreModel {
    pub fn new(config: MlpConfig, input_dim: usize) -> Self {
        MlpScoreModel {
            net_config: ScoreNetConfig::new(input_dim, &config),
            config,
            device: Default::default(),
            net: None,
            history: None,
        }
    }

    /// Load a saved network; it must have been fitted on `input_dim` columns
    pub fn load(config: MlpConfig, dir: &Path, input_dim: usize) -> Result<Self> {
        let net_config: ScoreNetConfig = read_json(&shape_file(dir))?;
        check_saved_width(input_dim, net_config.input_dim)?;

        let mut model = Self::new(config, input_dim);
        let net = ScoreNet::load(&model.device, dir.join(RECORD_NAME), &net_config)?;
        model.net_config = net_config;
        model.net = Some(net);
        Ok(model)
    }
}

impl ScoreModel for MlpScoreModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Mlp
    }

    fn input_dim(&self) -> usize {
        self.net_config.input_dim
    }

    fn fit(&mut self, x: &FeatureMatrix, home_goals: &[f32], away_goals: &[f32]) -> Result<()> {
        check_width(self.input_dim(), x)?;

        let trainer =
            MlpTrainer::<TrainingBackend>::new(&self.net_config, &self.config, self.device.clone());
        let (net, history) = trainer.train(x, home_goals, away_goals)?;

        self.net = Some(net.valid());
        self.history = Some(history);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<(f32, f32)>> {
        check_width(self.input_dim(), x)?;
        let net = self.net.as_ref().ok_or_else(|| {
            FootballError::FitFailure("mlp model used before fitting".to_string())
        })?;
        if x.rows() == 0 {
            return Ok(Vec::new());
        }

        let input = Tensor::<InferenceBackend, 1>::from_floats(x.as_slice(), &self.device)
            .reshape([x.rows(), x.cols()]);
        let values = net
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| FootballError::FitFailure(format!("unreadable mlp output: {:?}", e)))?;

        Ok(values.chunks_exact(2).map(|p| (p[0], p[1])).collect())
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let net = self.net.as_ref().ok_or_else(|| {
            FootballError::FitFailure("mlp model saved before fitting".to_string())
        })?;
        net.save(dir.join(RECORD_NAME))?;
        write_json(&shape_file(dir), &self.net_config)?;
        log::info!("Saved mlp model to {}", record_file(dir).display());
        Ok(())
    }

    fn training_history(&self) -> Option<&TrainingHistory> {
        self.history.as_ref()
    }
}

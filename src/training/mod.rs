//! Model training
//!
//! Train/test split, the MLP training loop, evaluation metrics and the
//! end-to-end fitting pipeline.

pub mod metrics;
pub mod mlp_trainer;
pub mod split;
pub mod trainer;

pub use metrics::{Evaluation, RegressionMetrics, TrainingHistory};
pub use mlp_trainer::MlpTrainer;
pub use split::train_test_split;
pub use trainer::{load_artifacts, prepare_table, TrainedPipeline, Trainer};

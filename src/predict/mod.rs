//! Prediction and inference
//!
//! Predict a fixture's scoreline from a fitted preprocessor and model.

pub mod inference;

pub use inference::{decide_scoreline, format_prediction, FormPolicy, OutputFormat, Predictor};

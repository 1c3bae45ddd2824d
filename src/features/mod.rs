//! Feature extraction and encoding
//!
//! Converts raw match rows into model-ready features.

pub mod encoding;
pub mod form;
pub mod match_repr;

pub use encoding::{FeatureMatrix, Preprocessor};
pub use form::{team_form, FormOptions, WindowAnchor};
pub use match_repr::{engineer_features, FeatureRow, FeatureSet, NumericColumn};

//! Model adapter: a uniform `predict(vector) -> medal count` over every supported family.
//!
//! Artifacts are decoded by [`artifact`], evaluated by [`TreeEnsemble`], and loaded once per
//! process through the [`registry`]. The orchestrator only sees [`MedalModel`].

pub mod artifact;
mod ensemble;
pub mod registry;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvocationFailure;

pub use artifact::{ArtifactFormat, ModelArtifact};
pub use ensemble::TreeEnsemble;
pub use registry::{LoadedModel, ModelEntry, ModelRegistry, ModelSlot};
pub use tree::{Node, SplitRule, Tree};

/// Supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Additive boosted trees: `base_score + Σ leaf`.
    GradientBoosting,
    /// Bagged trees: `mean(leaf)`.
    RandomForest,
}

impl ModelFamily {
    /// Stable identifier used in configuration and output.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::GradientBoosting => "gradient_boosting",
            ModelFamily::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Anything that turns a feature vector into a medal count.
pub trait MedalModel: Send + Sync {
    /// Family, reported in forecast metadata.
    fn family(&self) -> ModelFamily;

    /// Input feature names, in vector order.
    fn feature_names(&self) -> &[String];

    /// Unprocessed model output; may be negative or fractional.
    fn predict_raw(&self, features: &[f64]) -> Result<f64, InvocationFailure>;

    /// Checked prediction, rounded and clamped to a non-negative count.
    fn predict(&self, features: &[f64]) -> Result<u32, InvocationFailure> {
        let expected = self.feature_names().len();
        if features.len() != expected {
            return Err(InvocationFailure::Shape {
                expected,
                actual: features.len(),
            });
        }
        postprocess(self.predict_raw(features)?)
    }
}

/// Round half away from zero and clamp at 0; NaN and infinities are invocation failures.
pub fn postprocess(raw: f64) -> Result<u32, InvocationFailure> {
    if !raw.is_finite() {
        return Err(InvocationFailure::NonFinite(raw));
    }
    Ok(raw.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postprocess_rounds_and_clamps() {
        assert_eq!(postprocess(12.4), Ok(12));
        assert_eq!(postprocess(12.5), Ok(13));
        assert_eq!(postprocess(-0.4), Ok(0));
        assert_eq!(postprocess(-37.0), Ok(0));
        assert!(matches!(postprocess(f64::NAN), Err(InvocationFailure::NonFinite(_))));
        assert!(matches!(
            postprocess(f64::NEG_INFINITY),
            Err(InvocationFailure::NonFinite(_))
        ));
    }

    #[test]
    fn family_round_trips_through_config_names() {
        let f: ModelFamily = serde_json::from_str("\"random_forest\"").unwrap();
        assert_eq!(f, ModelFamily::RandomForest);
        assert_eq!(ModelFamily::GradientBoosting.to_string(), "gradient_boosting");
    }
}

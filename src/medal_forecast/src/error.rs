//! Error taxonomy of the forecasting pipeline.
//!
//! Only [`ForecastError`] ever reaches a caller as an `Err`. Every other type here describes a
//! degradation: it is logged, counted in the forecast metadata, and the pipeline carries on.

use std::path::PathBuf;

use olympic_stats::RepoError;
use thiserror::Error;

/// Fatal failure of a forecast request.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The stats store could not be read; no partial result is produced.
    #[error("repository unavailable")]
    RepositoryUnavailable(#[from] RepoError),
}

/// A model artifact could not be turned into a usable model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// The artifact file could not be read.
    #[error("cannot read model artifact {path}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Leading bytes match neither the legacy binary nor the JSON encoding.
    #[error("unrecognised model artifact format")]
    UnknownFormat,
    /// The legacy binary body failed to decode.
    #[error("corrupt legacy model artifact: {0}")]
    LegacyDecode(#[from] bincode::error::DecodeError),
    /// The JSON body failed to decode.
    #[error("corrupt JSON model artifact: {0}")]
    JsonDecode(#[from] serde_json::Error),
    /// The artifact decoded but describes an unusable model.
    #[error("invalid model: {0}")]
    Invalid(String),
    /// Neither the artifact nor the configuration lists the model's input features.
    #[error("model declares no feature names and no fallback is configured")]
    MissingFeatureNames,
    /// The artifact holds a different model family than configured.
    #[error("artifact family {found} does not match configured family {expected}")]
    FamilyMismatch {
        /// Family named in the configuration.
        expected: crate::model::ModelFamily,
        /// Family found in the artifact.
        found: crate::model::ModelFamily,
    },
}

/// What went wrong inside a single `predict` call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvocationFailure {
    /// Feature vector length differs from the model's feature count.
    #[error("expected {expected} features, got {actual}")]
    Shape {
        /// Features the model was trained on.
        expected: usize,
        /// Features supplied.
        actual: usize,
    },
    /// Tree traversal left the node array or exceeded the node count.
    #[error("tree {tree} is malformed at node {node}")]
    MalformedTree {
        /// Tree position in the ensemble.
        tree: usize,
        /// Node index at which traversal failed.
        node: usize,
    },
    /// The model produced NaN or infinity.
    #[error("non-finite output {0}")]
    NonFinite(f64),
    /// Any other model-specific failure.
    #[error("{0}")]
    Other(String),
}

/// A single model/country prediction failed; the pair contributes 0.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("prediction failed for {country_code} with model {model}: {failure}")]
pub struct PredictionInvocationError {
    /// Registered model name.
    pub model: String,
    /// Country whose vector was being scored.
    pub country_code: String,
    /// Cause.
    #[source]
    pub failure: InvocationFailure,
}

/// A model feature matched no rule and is fed as 0.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("model {model}: feature {feature} is not mapped by any rule, defaulting to 0")]
pub struct FeatureMaterializationWarning {
    /// Registered model name.
    pub model: String,
    /// Feature name as declared by the model.
    pub feature: String,
}

/// An authoritative results entry whose name maps to no country code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no country code mapped for {name:?}")]
pub struct MappingMiss {
    /// Entity name as it appears in the authoritative table.
    pub name: String,
}

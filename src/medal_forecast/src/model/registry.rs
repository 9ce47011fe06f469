//! Load-once model registry.
//!
//! The caller builds one [`ModelRegistry`] at startup and hands it to the orchestrator. Artifacts
//! are read on the first call to [`ModelRegistry::slots`] and kept for the life of the value;
//! nothing is ever reloaded. A model that fails to load stays registered as
//! [`ModelSlot::Unavailable`] so it still counts (as 0) in the consensus.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ArtifactFormat, MedalModel, ModelFamily, TreeEnsemble, artifact};
use crate::{
    error::{FeatureMaterializationWarning, ModelLoadError},
    features::{FeatureSpec, RuleTable},
};

/// One configured model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    /// Name used as the prediction column (`predicted_<name>` in reports).
    pub name: String,
    /// Family the artifact must contain.
    pub family: ModelFamily,
    /// Artifact path, relative to the model directory unless absolute.
    pub file: PathBuf,
    /// Feature names to use when the artifact does not record them.
    #[serde(default)]
    pub fallback_features: Option<Vec<String>>,
}

/// A model that loaded successfully, with its feature spec derived.
pub struct LoadedModel {
    /// Registered name.
    pub name: String,
    /// The model.
    pub model: Box<dyn MedalModel>,
    /// Feature spec derived from the model's feature names.
    pub spec: FeatureSpec,
    /// Encoding the artifact was read from; `None` for in-memory models.
    pub format: Option<ArtifactFormat>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("family", &self.model.family())
            .field("features", &self.spec.len())
            .field("format", &self.format)
            .finish()
    }
}

/// Registry position of one configured model.
#[derive(Debug)]
pub enum ModelSlot {
    /// Loaded and usable.
    Ready(LoadedModel),
    /// Failed to load; contributes 0 everywhere.
    Unavailable {
        /// Registered name.
        name: String,
        /// Configured family.
        family: ModelFamily,
        /// Why loading failed.
        error: ModelLoadError,
    },
}

impl ModelSlot {
    /// Wrap an in-memory model, deriving its feature spec.
    pub fn ready(name: impl Into<String>, model: impl MedalModel + 'static, rules: &RuleTable) -> Self {
        Self::Ready(loaded(name.into(), Box::new(model), None, rules))
    }

    /// Register a model that could not be loaded.
    pub fn unavailable(name: impl Into<String>, family: ModelFamily, error: ModelLoadError) -> Self {
        Self::Unavailable {
            name: name.into(),
            family,
            error,
        }
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(m) => &m.name,
            Self::Unavailable { name, .. } => name,
        }
    }

    /// Family of the model (configured family when unavailable).
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::Ready(m) => m.model.family(),
            Self::Unavailable { family, .. } => *family,
        }
    }

    /// The loaded model, if any.
    pub fn loaded(&self) -> Option<&LoadedModel> {
        match self {
            Self::Ready(m) => Some(m),
            Self::Unavailable { .. } => None,
        }
    }
}

fn loaded(
    name: String,
    model: Box<dyn MedalModel>,
    format: Option<ArtifactFormat>,
    rules: &RuleTable,
) -> LoadedModel {
    let spec = FeatureSpec::derive(model.feature_names(), rules);
    for feature in spec.unmapped() {
        let warning = FeatureMaterializationWarning {
            model: name.clone(),
            feature,
        };
        warn!(%warning, "unmapped model feature");
    }
    LoadedModel {
        name,
        model,
        spec,
        format,
    }
}

/// Ordered set of registered models, loaded lazily and exactly once.
#[derive(Debug)]
pub struct ModelRegistry {
    dir: PathBuf,
    entries: Vec<ModelEntry>,
    rules: RuleTable,
    slots: OnceCell<Vec<ModelSlot>>,
}

impl ModelRegistry {
    /// Registry over `entries`, resolving relative artifact paths against `dir`.
    pub fn new(dir: impl Into<PathBuf>, entries: Vec<ModelEntry>, rules: RuleTable) -> Self {
        Self {
            dir: dir.into(),
            entries,
            rules,
            slots: OnceCell::new(),
        }
    }

    /// Registry over already-built slots; nothing is read from disk.
    pub fn from_slots(slots: Vec<ModelSlot>) -> Self {
        Self {
            dir: PathBuf::new(),
            entries: Vec::new(),
            rules: RuleTable::default(),
            slots: OnceCell::with_value(slots),
        }
    }

    /// Configured entries (empty for [`from_slots`](Self::from_slots) registries).
    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Resolved artifact path of `entry`.
    pub fn artifact_path(&self, entry: &ModelEntry) -> PathBuf {
        self.dir.join(&entry.file)
    }

    /// All slots in registration order; the first call loads every artifact.
    pub fn slots(&self) -> &[ModelSlot] {
        self.slots.get_or_init(|| self.load_all())
    }

    /// Number of registered models, loaded or not.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// `true` when no model is registered.
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    fn load_all(&self) -> Vec<ModelSlot> {
        self.entries
            .iter()
            .map(|entry| {
                let path = self.artifact_path(entry);
                match load_entry(entry, &path, &self.rules) {
                    Ok(model) => {
                        info!(
                            model = %model.name,
                            family = %entry.family,
                            format = ?model.format,
                            features = model.spec.len(),
                            path = %path.display(),
                            "model loaded"
                        );
                        ModelSlot::Ready(model)
                    }
                    Err(error) => {
                        warn!(
                            model = %entry.name,
                            path = %path.display(),
                            error = %error,
                            "model unavailable; it will contribute 0 to every forecast"
                        );
                        ModelSlot::unavailable(entry.name.clone(), entry.family, error)
                    }
                }
            })
            .collect()
    }
}

fn load_entry(entry: &ModelEntry, path: &Path, rules: &RuleTable) -> Result<LoadedModel, ModelLoadError> {
    let (artifact, format) = artifact::read_artifact(path)?;
    if artifact.family != entry.family {
        return Err(ModelLoadError::FamilyMismatch {
            expected: entry.family,
            found: artifact.family,
        });
    }
    let ensemble = TreeEnsemble::from_artifact(artifact, entry.fallback_features.as_deref())?;
    Ok(loaded(entry.name.clone(), Box::new(ensemble), Some(format), rules))
}

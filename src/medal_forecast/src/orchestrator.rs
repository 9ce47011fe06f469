//! Forecast orchestration: baseline → eligibility → per-model passes → consensus → ranking.

use indexmap::IndexMap;
use olympic_stats::{Season, StatsRecord, StatsRepo};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    eligibility::EligibilityFilter,
    error::{ForecastError, PredictionInvocationError},
    features::{MaterializeContext, materialize},
    model::{ArtifactFormat, ModelFamily, ModelRegistry, ModelSlot},
};

/// The Games edition being forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edition {
    /// Edition year.
    pub year: i32,
    /// Summer or Winter.
    pub season: Season,
    /// Host country code.
    pub host: String,
}

impl Edition {
    /// Edition with the host code trimmed and upper-cased.
    pub fn new(year: i32, season: Season, host: &str) -> Self {
        Self {
            year,
            season,
            host: host.trim().to_ascii_uppercase(),
        }
    }
}

/// Forecast for one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Country code.
    pub country_code: String,
    /// Model name → predicted medals, in registry order.
    pub predictions: IndexMap<String, u32>,
    /// Rounded mean of `predictions`.
    pub consensus: u32,
    /// Athlete count of the baseline record.
    pub baseline_athletes: u32,
    /// Year of the baseline record.
    pub baseline_year: i32,
}

/// How one registered model fared during a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    /// Registered name.
    pub name: String,
    /// Model family.
    pub family: ModelFamily,
    /// Artifact encoding, when loaded from disk.
    pub format: Option<ArtifactFormat>,
    /// `false` when the model failed to load and contributed 0 everywhere.
    pub available: bool,
    /// Load failure, when unavailable.
    pub error: Option<String>,
    /// Features filled by lossy proxies.
    pub proxied_features: Vec<String>,
    /// Features no rule could fill (fed as 0).
    pub unmapped_features: Vec<String>,
    /// Countries for which `predict` failed and 0 was used.
    pub failed_predictions: usize,
}

/// Full forecast output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Target edition.
    pub edition: Edition,
    /// Ranked results: consensus descending, then country code ascending.
    pub results: Vec<PredictionResult>,
    /// One entry per registered model, in registry order.
    pub models: Vec<ModelStatus>,
    /// Set when any model is unavailable or any prediction failed.
    pub degraded: bool,
}

/// Rounded mean, half away from zero; 0 for no inputs.
pub fn consensus(predictions: &[u32]) -> u32 {
    if predictions.is_empty() {
        return 0;
    }
    let sum: u64 = predictions.iter().map(|&p| u64::from(p)).sum();
    (sum as f64 / predictions.len() as f64).round() as u32
}

struct ModelPass {
    predictions: Vec<u32>,
    failures: usize,
}

/// Runs forecasts over a stats repository and a model registry.
pub struct Orchestrator<'a, R: ?Sized> {
    repo: &'a R,
    registry: &'a ModelRegistry,
    eligibility: &'a EligibilityFilter,
}

impl<'a, R: StatsRepo + ?Sized> Orchestrator<'a, R> {
    /// Orchestrator over borrowed collaborators.
    pub fn new(repo: &'a R, registry: &'a ModelRegistry, eligibility: &'a EligibilityFilter) -> Self {
        Self {
            repo,
            registry,
            eligibility,
        }
    }

    /// Forecast `edition`.
    ///
    /// Only a repository failure is an error. Unavailable models and failed predictions count
    /// as 0 and are reported in [`Forecast::models`].
    pub fn predict(&self, edition: &Edition) -> Result<Forecast, ForecastError> {
        let baseline = self.repo.latest_baseline(edition.season)?;
        let fetched = baseline.len();
        let records: Vec<StatsRecord> = baseline
            .into_iter()
            .filter(|r| self.eligibility.is_eligible(&r.country_code))
            .collect();
        debug!(
            season = %edition.season,
            fetched,
            eligible = records.len(),
            "baseline loaded"
        );

        let slots = self.registry.slots();
        let ctx = MaterializeContext {
            host_country_code: &edition.host,
            season: edition.season,
        };

        // Independent passes; collect() is the barrier before aggregation.
        let passes: Vec<ModelPass> = slots.par_iter().map(|slot| run_pass(slot, &records, &ctx)).collect();

        let mut results: Vec<PredictionResult> = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let values: Vec<u32> = passes.iter().map(|p| p.predictions[i]).collect();
                PredictionResult {
                    country_code: record.country_code.clone(),
                    predictions: slots
                        .iter()
                        .zip(&values)
                        .map(|(slot, &v)| (slot.name().to_string(), v))
                        .collect(),
                    consensus: consensus(&values),
                    baseline_athletes: record.total_athletes,
                    baseline_year: record.year,
                }
            })
            .collect();
        results.sort_by(|a, b| {
            b.consensus
                .cmp(&a.consensus)
                .then_with(|| a.country_code.cmp(&b.country_code))
        });

        let models: Vec<ModelStatus> = slots.iter().zip(&passes).map(|(s, p)| status(s, p.failures)).collect();
        let degraded = models.iter().any(|m| !m.available || m.failed_predictions > 0);
        info!(
            year = edition.year,
            season = %edition.season,
            host = %edition.host,
            countries = results.len(),
            models = models.len(),
            degraded,
            "forecast complete"
        );

        Ok(Forecast {
            edition: edition.clone(),
            results,
            models,
            degraded,
        })
    }
}

fn run_pass(slot: &ModelSlot, records: &[StatsRecord], ctx: &MaterializeContext<'_>) -> ModelPass {
    let Some(loaded) = slot.loaded() else {
        return ModelPass {
            predictions: vec![0; records.len()],
            failures: 0,
        };
    };
    let mut failures = 0;
    let predictions = records
        .iter()
        .map(|record| {
            let vector = materialize(record, &loaded.spec, ctx);
            loaded.model.predict(&vector).unwrap_or_else(|failure| {
                failures += 1;
                let err = PredictionInvocationError {
                    model: loaded.name.clone(),
                    country_code: record.country_code.clone(),
                    failure,
                };
                warn!(
                    model = %err.model,
                    country = %err.country_code,
                    error = %err,
                    "prediction failed; using 0"
                );
                0
            })
        })
        .collect();
    ModelPass { predictions, failures }
}

fn status(slot: &ModelSlot, failed_predictions: usize) -> ModelStatus {
    match slot {
        ModelSlot::Ready(m) => ModelStatus {
            name: m.name.clone(),
            family: m.model.family(),
            format: m.format,
            available: true,
            error: None,
            proxied_features: m.spec.proxied(),
            unmapped_features: m.spec.unmapped(),
            failed_predictions,
        },
        ModelSlot::Unavailable { name, family, error } => ModelStatus {
            name: name.clone(),
            family: *family,
            format: None,
            available: false,
            error: Some(error.to_string()),
            proxied_features: Vec::new(),
            unmapped_features: Vec::new(),
            failed_predictions,
        },
    }
}

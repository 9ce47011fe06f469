//! Forecast vs. authoritative results.
//!
//! Best-effort enrichment: authoritative names that map to no code are logged as
//! [`MappingMiss`] and dropped, never fatal.

mod names;
mod results;

pub use names::CountryNameMap;
pub use results::{AuthoritativeEntry, read_results, read_results_path};

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{error::MappingMiss, orchestrator::PredictionResult};

/// Direction of the forecast error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Forecast matched.
    Perfect,
    /// Country won more than forecast.
    Under,
    /// Country won fewer than forecast.
    Over,
}

impl Status {
    /// Lower-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Perfect => "perfect",
            Status::Under => "under",
            Status::Over => "over",
        }
    }

    fn of(diff: i64) -> Self {
        match diff.signum() {
            0 => Status::Perfect,
            1 => Status::Under,
            _ => Status::Over,
        }
    }
}

/// One country's forecast next to its actual total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    /// Country code.
    pub country_code: String,
    /// Consensus forecast (0 when not forecast).
    pub predicted: u32,
    /// Actual medals (0 when absent from the authoritative table).
    pub real: u32,
    /// `real - predicted`.
    pub diff: i64,
    /// Sign of `diff`.
    pub status: Status,
}

/// Join predictions with authoritative totals.
///
/// Outer join on country code; rows where both sides are 0 are dropped. Sorted by predicted
/// descending, then code ascending.
pub fn compare(
    predictions: &[PredictionResult],
    authoritative: &[AuthoritativeEntry],
    names: &CountryNameMap,
) -> Vec<ComparisonResult> {
    let mut real: IndexMap<&str, u32> = IndexMap::new();
    for entry in authoritative {
        let Some(code) = names.lookup(&entry.name) else {
            let miss = MappingMiss {
                name: entry.name.clone(),
            };
            warn!(%miss, "authoritative entry dropped");
            continue;
        };
        if real.contains_key(code) {
            warn!(name = %entry.name, code, "duplicate authoritative entry ignored");
            continue;
        }
        real.insert(code, entry.total);
    }

    let predicted: IndexMap<&str, u32> = predictions
        .iter()
        .map(|p| (p.country_code.as_str(), p.consensus))
        .collect();

    let codes: BTreeSet<&str> = predicted.keys().chain(real.keys()).copied().collect();
    let mut rows: Vec<ComparisonResult> = codes
        .into_iter()
        .filter_map(|code| {
            let p = predicted.get(code).copied().unwrap_or(0);
            let r = real.get(code).copied().unwrap_or(0);
            if p == 0 && r == 0 {
                return None;
            }
            let diff = i64::from(r) - i64::from(p);
            Some(ComparisonResult {
                country_code: code.to_string(),
                predicted: p,
                real: r,
                diff,
                status: Status::of(diff),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.predicted
            .cmp(&a.predicted)
            .then_with(|| a.country_code.cmp(&b.country_code))
    });
    debug!(rows = rows.len(), "comparison built");
    rows
}

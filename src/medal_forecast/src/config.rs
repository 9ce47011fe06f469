//! Forecast configuration: parsing, normalization, and loading.
//!
//! Every section has defaults, so an empty file is a valid configuration:
//!
//! ```toml
//! [database]
//! url = "olympics.db"
//! busy_timeout_ms = 5000
//!
//! [edition]
//! year = 2024
//! season = "Summer"
//! host = "FRA"
//!
//! [eligibility]
//! defunct = ["URS", "GDR", "FRG"]
//!
//! [models]
//! dir = "models"
//! [[models.entries]]
//! name = "xgb"
//! family = "gradient_boosting"
//! file = "xgb_model.json"
//!
//! [features]
//! avg_age_default = 24.0
//! proxy_constants = { avg_athlete_experience = 1.0 }
//!
//! [reconcile]
//! names_file = "country_names.toml"
//! ```
//!
//! Entrypoints: [`load_config_str`] and [`load_config_path`]. Normalization trims strings,
//! upper-cases country codes, de-duplicates the defunct list preserving order, and rejects
//! duplicate model names.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use olympic_stats::{Season, db::connection::DEFAULT_BUSY_TIMEOUT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    eligibility::{DEFAULT_DEFUNCT_CODES, EligibilityFilter},
    features::{RuleTable, rules::DEFAULT_AVG_AGE},
    model::{ModelEntry, ModelFamily, ModelRegistry},
    orchestrator::Edition,
    reconcile::CountryNameMap,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ForecastConfig {
    /// Stats database.
    pub database: DatabaseCfg,
    /// Edition forecast by default.
    pub edition: EditionCfg,
    /// Excluded country codes.
    pub eligibility: EligibilityCfg,
    /// Registered models.
    pub models: ModelsCfg,
    /// Rule-table tuning.
    pub features: FeaturesCfg,
    /// Comparison settings.
    pub reconcile: ReconcileCfg,
}

/// `[database]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct DatabaseCfg {
    /// SQLite path or `sqlite://` URL.
    pub url: String,
    /// Lock wait bound, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseCfg {
    fn default() -> Self {
        Self {
            url: "olympics.db".into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl DatabaseCfg {
    /// Busy timeout as a duration.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// `[edition]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EditionCfg {
    /// Edition year.
    pub year: i32,
    /// Edition season.
    pub season: Season,
    /// Host country code.
    pub host: String,
}

impl Default for EditionCfg {
    fn default() -> Self {
        Self {
            year: 2024,
            season: Season::Summer,
            host: "FRA".into(),
        }
    }
}

impl EditionCfg {
    /// The configured edition.
    pub fn edition(&self) -> Edition {
        Edition::new(self.year, self.season, &self.host)
    }
}

/// `[eligibility]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EligibilityCfg {
    /// Codes that cannot compete in future editions.
    pub defunct: Vec<String>,
}

impl Default for EligibilityCfg {
    fn default() -> Self {
        Self {
            defunct: DEFAULT_DEFUNCT_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// `[models]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ModelsCfg {
    /// Directory artifact paths are relative to.
    pub dir: PathBuf,
    /// Models in registration order.
    pub entries: Vec<ModelEntry>,
}

impl Default for ModelsCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            entries: vec![
                ModelEntry {
                    name: "xgb".into(),
                    family: ModelFamily::GradientBoosting,
                    file: PathBuf::from("xgb_model.json"),
                    fallback_features: None,
                },
                ModelEntry {
                    name: "rf".into(),
                    family: ModelFamily::RandomForest,
                    file: PathBuf::from("rf_model.bin"),
                    fallback_features: Some(
                        [
                            "total_athletes",
                            "avg_age_athletes",
                            "cumulative_medals",
                            "is_host",
                            "season_Winter",
                        ]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    ),
                },
            ],
        }
    }
}

/// `[features]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct FeaturesCfg {
    /// Substitute for a missing mean athlete age.
    pub avg_age_default: f64,
    /// Proxy constants overriding or extending the built-in ones.
    pub proxy_constants: IndexMap<String, f64>,
}

impl Default for FeaturesCfg {
    fn default() -> Self {
        Self {
            avg_age_default: DEFAULT_AVG_AGE,
            proxy_constants: IndexMap::new(),
        }
    }
}

/// `[reconcile]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReconcileCfg {
    /// Replacement name→code table; the embedded one is used when absent.
    pub names_file: Option<PathBuf>,
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Defunct codes removed as duplicates.
    pub defunct_deduped: usize,
    /// Strings changed by trimming or upper-casing.
    pub values_rewritten: usize,
}

fn rewrite(value: &mut String, normalized: String, report: &mut NormalizationReport) {
    if *value != normalized {
        *value = normalized;
        report.values_rewritten += 1;
    }
}

/// Normalize a configuration in place.
///
/// Errors:
/// - Empty host code or model name after trimming
/// - Duplicate model names
/// - Non-finite feature defaults
pub fn normalize_config(cfg: &mut ForecastConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let host = cfg.edition.host.trim().to_ascii_uppercase();
    if host.is_empty() {
        bail!("edition.host cannot be empty");
    }
    rewrite(&mut cfg.edition.host, host, &mut report);

    let mut seen = HashSet::new();
    let before = cfg.eligibility.defunct.len();
    let mut defunct = Vec::with_capacity(before);
    for code in std::mem::take(&mut cfg.eligibility.defunct) {
        let norm = code.trim().to_ascii_uppercase();
        if norm.is_empty() {
            bail!("eligibility.defunct contains an empty code");
        }
        if norm != code {
            report.values_rewritten += 1;
        }
        if seen.insert(norm.clone()) {
            defunct.push(norm);
        }
    }
    report.defunct_deduped = before - defunct.len();
    cfg.eligibility.defunct = defunct;

    let mut names = HashSet::new();
    for entry in &mut cfg.models.entries {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            bail!("model name cannot be empty");
        }
        if !names.insert(name.clone()) {
            bail!("duplicate model name: {name}");
        }
        rewrite(&mut entry.name, name, &mut report);
        if let Some(features) = &mut entry.fallback_features {
            for f in features.iter_mut() {
                let trimmed = f.trim().to_string();
                rewrite(f, trimmed, &mut report);
            }
        }
    }

    if !cfg.features.avg_age_default.is_finite() {
        bail!("features.avg_age_default must be finite");
    }
    if let Some((name, _)) = cfg.features.proxy_constants.iter().find(|(_, v)| !v.is_finite()) {
        bail!("features.proxy_constants.{name} must be finite");
    }

    Ok(report)
}

/// Parse and normalize a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<ForecastConfig> {
    let mut cfg: ForecastConfig = toml::from_str(toml_str).context("failed to parse forecast config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    debug!(?report, "configuration normalized");
    Ok(cfg)
}

/// Read a configuration file from disk, parse, and normalize it.
///
/// Relative `models.dir` and `reconcile.names_file` are resolved against the file's directory.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<ForecastConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("read config file {}", path.display()))?;
    let mut cfg = load_config_str(&text)?;
    if let Some(base) = path.parent() {
        cfg.models.dir = base.join(&cfg.models.dir);
        cfg.reconcile.names_file = cfg.reconcile.names_file.map(|f| base.join(f));
    }
    Ok(cfg)
}

impl ForecastConfig {
    /// Rule table with the configured overrides applied.
    pub fn rule_table(&self) -> RuleTable {
        self.features
            .proxy_constants
            .iter()
            .fold(
                RuleTable::default().with_avg_age_default(self.features.avg_age_default),
                |rules, (name, value)| rules.with_proxy_constant(name.clone(), *value),
            )
    }

    /// Eligibility filter from `[eligibility]`.
    pub fn eligibility_filter(&self) -> EligibilityFilter {
        EligibilityFilter::new(&self.eligibility.defunct)
    }

    /// Unloaded registry over `[models]`.
    pub fn model_registry(&self) -> ModelRegistry {
        ModelRegistry::new(&self.models.dir, self.models.entries.clone(), self.rule_table())
    }

    /// Name table from `[reconcile]`, or the embedded default.
    pub fn country_names(&self) -> anyhow::Result<CountryNameMap> {
        match &self.reconcile.names_file {
            Some(path) => CountryNameMap::from_path(path),
            None => CountryNameMap::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, ForecastConfig::default());
        assert_eq!(cfg.edition.edition(), Edition::new(2024, Season::Summer, "FRA"));
        assert_eq!(cfg.eligibility.defunct.len(), 14);
        assert_eq!(cfg.database.busy_timeout(), Duration::from_millis(5000));
        let rf = &cfg.models.entries[1];
        assert_eq!(rf.family, ModelFamily::RandomForest);
        assert_eq!(rf.fallback_features.as_ref().map(Vec::len), Some(5));
    }

    #[test]
    fn normalizes_codes_and_names() {
        let mut cfg: ForecastConfig = toml::from_str(
            r#"
            [edition]
            year = 2028
            season = "Summer"
            host = " usa "

            [eligibility]
            defunct = ["urs", "URS", " gdr"]

            [[models.entries]]
            name = " rf "
            family = "random_forest"
            file = "rf.bin"
            "#,
        )
        .unwrap();
        let report = normalize_config(&mut cfg).unwrap();
        assert_eq!(cfg.edition.host, "USA");
        assert_eq!(cfg.eligibility.defunct, vec!["URS", "GDR"]);
        assert_eq!(cfg.models.entries[0].name, "rf");
        assert_eq!(report.defunct_deduped, 1);
        assert_eq!(report.values_rewritten, 4);
    }

    #[test]
    fn rejects_duplicates_and_unknown_keys() {
        let err = load_config_str(
            r#"
            [[models.entries]]
            name = "rf"
            family = "random_forest"
            file = "a.bin"
            [[models.entries]]
            name = "rf"
            family = "random_forest"
            file = "b.bin"
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("duplicate model name: rf"));

        assert!(load_config_str("[database]\npath = \"x.db\"\n").is_err());
        assert!(load_config_str("[edition]\nseason = \"Spring\"\n").is_err());
    }

    #[test]
    fn proxy_constants_reach_the_rule_table() {
        let cfg = load_config_str(
            r#"
            [features]
            avg_age_default = 25.5
            proxy_constants = { gdp_per_capita = 42000.0 }
            "#,
        )
        .unwrap();
        let rules = cfg.rule_table();
        assert_eq!(rules.avg_age_default(), 25.5);
        assert_eq!(
            rules.resolve("gdp_per_capita"),
            crate::features::FillRule::ProxyConstant { value: 42000.0 }
        );
    }

    #[test]
    fn path_loading_resolves_relative_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.toml");
        std::fs::write(&path, "[models]\ndir = \"artifacts\"\nentries = []\n").unwrap();
        let cfg = load_config_path(&path).unwrap();
        assert_eq!(cfg.models.dir, dir.path().join("artifacts"));
        assert!(cfg.models.entries.is_empty());
        assert!(cfg.country_names().unwrap().lookup("France").is_some());
    }
}

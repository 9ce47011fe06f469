//! Medal-count forecasting for a future Olympic Games edition.
//!
//! Pipeline: [`olympic_stats::StatsRepo`] baseline → [`features`] materialization →
//! [`model`] adapters → [`orchestrator`] consensus → optional [`reconcile`] against published
//! results. Configuration lives in [`config`].
//!
//! ```no_run
//! use medal_forecast::{config::load_config_path, orchestrator::Orchestrator};
//! use olympic_stats::SqliteStatsRepo;
//!
//! let cfg = load_config_path("config/medal_forecast.toml").unwrap();
//! let repo = SqliteStatsRepo::with_timeout(&cfg.database.url, cfg.database.busy_timeout());
//! let registry = cfg.model_registry();
//! let eligibility = cfg.eligibility_filter();
//! let forecast = Orchestrator::new(&repo, &registry, &eligibility)
//!     .predict(&cfg.edition.edition())
//!     .unwrap();
//! for r in forecast.results.iter().take(10) {
//!     println!("{} {}", r.country_code, r.consensus);
//! }
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod eligibility;
pub mod error;
pub mod features;
pub mod model;
pub mod orchestrator;
pub mod reconcile;

pub use error::ForecastError;
pub use orchestrator::{Edition, Forecast, Orchestrator, PredictionResult};

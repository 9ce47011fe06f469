//! Storage layer for historical per-country Olympic statistics.
//!
//! The table is bulk-loaded by [`import`] and otherwise read-only; [`repo`] exposes the queries the
//! forecasting pipeline and the dashboard consume.

#![deny(missing_docs)]

pub mod db;
pub mod import;
pub mod models;
pub mod repo;
#[allow(missing_docs)]
pub mod schema;
pub mod season;

pub use models::StatsRecord;
pub use repo::{RepoError, RepoResult, SqliteStatsRepo, StatsRepo};
pub use season::Season;

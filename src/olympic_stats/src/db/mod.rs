//! Database utilities for connections and schema migrations.
//!
//! This module provides:
//! - SQLite connection helpers: [`connection::connect_sqlite`] applies WAL, foreign_keys=ON, and a
//!   caller-chosen busy_timeout (the bounded wait used by every read of the stats table).
//! - Embedded Diesel migrations and runners: [`migrate::run_sqlite`] and [`migrate::run_all`].
//!
//! Example:
//! ```no_run
//! use std::time::Duration;
//! use olympic_stats::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("olympic_stats_example.db");
//! migrate::run_all(db_path.to_str().unwrap()).expect("migrations");
//!
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap(), Duration::from_secs(5))
//!     .expect("connect");
//! ```

pub mod connection;
pub mod migrate;

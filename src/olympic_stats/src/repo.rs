//! Read-only access to the stats table.
//!
//! [`StatsRepo`] is the portable surface the forecasting pipeline depends on; [`SqliteStatsRepo`]
//! is the SQLite implementation. Each call opens its own connection with a bounded busy timeout,
//! so a locked or missing database surfaces as [`RepoError::Unavailable`] instead of hanging.

use std::{collections::HashSet, time::Duration};

use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_query,
    sql_types::{BigInt, Text},
};
use serde::Serialize;

use crate::{
    db::connection::{DEFAULT_BUSY_TIMEOUT, connect_existing},
    models::{StatsRecord, StatsRow},
    schema::olympic_stats::dsl as os,
    season::Season,
};

#[derive(thiserror::Error, Debug)]
/// Errors raised by the stats repository.
pub enum RepoError {
    /// The backing store could not be reached, or a lock wait exceeded the timeout.
    #[error("stats store unavailable: {0}")]
    Unavailable(String),
    /// The store answered but the query failed (e.g., the schema drifted).
    #[error("stats query failed: {0}")]
    Query(#[source] DieselError),
}

impl From<DieselError> for RepoError {
    fn from(err: DieselError) -> Self {
        match &err {
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                RepoError::Unavailable(info.message().to_string())
            }
            DieselError::DatabaseError(_, info) if is_lock_timeout(info.message()) => {
                RepoError::Unavailable(info.message().to_string())
            }
            _ => RepoError::Query(err),
        }
    }
}

fn is_lock_timeout(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("database is locked") || m.contains("database is busy")
}

/// Result type used throughout the stats repository.
pub type RepoResult<T> = Result<T, RepoError>;

/// Dashboard headline figures over the whole table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Distinct Games editions (`slug_game`).
    pub total_games: i64,
    /// Distinct country codes.
    pub total_countries: i64,
    /// Sum of athletes entered; counts participations, not unique people.
    pub total_athletes: i64,
    /// Sum of medals won.
    pub total_medals: i64,
}

/// All-time medal total for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, QueryableByName)]
pub struct CountryMedals {
    /// Country code.
    #[diesel(sql_type = Text)]
    pub country_code: String,
    /// Medals summed over every edition on record.
    #[diesel(sql_type = BigInt)]
    pub medals: i64,
}

/// Portable surface, SQLite implementation is [`SqliteStatsRepo`].
pub trait StatsRepo {
    /// Most recent record per country in `season`; greatest year wins, the first imported row
    /// wins among duplicates. A country whose newest row is malformed is left out rather than
    /// falling back to an older edition. Zero matching rows is an empty vector, not an error.
    fn latest_baseline(&self, season: Season) -> RepoResult<Vec<StatsRecord>>;

    /// Headline aggregates for the dashboard.
    fn summary(&self) -> RepoResult<DashboardSummary>;

    /// Countries ranked by all-time medals (descending, ties by code), at most `limit`.
    fn top_countries(&self, limit: u32) -> RepoResult<Vec<CountryMedals>>;
}

/// Stats repository backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStatsRepo {
    database_url: String,
    busy_timeout: Duration,
}

impl SqliteStatsRepo {
    /// Repository over `database_url` using the default busy timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self::with_timeout(database_url, DEFAULT_BUSY_TIMEOUT)
    }

    /// Repository over `database_url` waiting at most `busy_timeout` on locks.
    pub fn with_timeout(database_url: impl Into<String>, busy_timeout: Duration) -> Self {
        Self {
            database_url: database_url.into(),
            busy_timeout,
        }
    }

    /// Database URL this repository reads from.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    fn connect(&self) -> RepoResult<SqliteConnection> {
        connect_existing(&self.database_url, self.busy_timeout)
            .map_err(|e| RepoError::Unavailable(e.to_string()))
    }
}

impl StatsRepo for SqliteStatsRepo {
    fn latest_baseline(&self, season: Season) -> RepoResult<Vec<StatsRecord>> {
        let mut conn = self.connect()?;
        latest_baseline_in(&mut conn, season)
    }

    fn summary(&self) -> RepoResult<DashboardSummary> {
        let mut conn = self.connect()?;
        summary_in(&mut conn)
    }

    fn top_countries(&self, limit: u32) -> RepoResult<Vec<CountryMedals>> {
        let mut conn = self.connect()?;
        top_countries_in(&mut conn, limit)
    }
}

/// [`StatsRepo::latest_baseline`] on an already open connection.
pub fn latest_baseline_in(conn: &mut SqliteConnection, season: Season) -> RepoResult<Vec<StatsRecord>> {
    let rows: Vec<StatsRow> = os::olympic_stats
        .filter(os::season.eq(season.as_db_str()))
        .order((os::country_code.asc(), os::year.desc(), os::id.asc()))
        .select(StatsRow::as_select())
        .load(conn)?;

    Ok(baseline_from_rows(rows))
}

/// Reduce rows sorted by (country asc, year desc, id asc) to one record per country.
///
/// The newest row is chosen before conversion. If that row is malformed the country is left out
/// of the baseline with a warning; it never falls back to an older edition.
pub fn baseline_from_rows(rows: Vec<StatsRow>) -> Vec<StatsRecord> {
    latest_per_country(rows)
        .into_iter()
        .filter_map(|row| {
            let country = row.country_code.clone();
            let year = row.year;
            match StatsRecord::try_from(row) {
                Ok(rec) => Some(rec),
                Err(e) => {
                    tracing::warn!(%country, year, error = %e, "latest stats row is malformed; country skipped");
                    None
                }
            }
        })
        .collect()
}

/// Keep the first row seen per country code.
///
/// Callers sort by (country asc, year desc, id asc) beforehand, so "first" means the latest
/// edition and, among duplicate editions, the earliest imported row.
pub fn latest_per_country(rows: Vec<StatsRow>) -> Vec<StatsRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.country_code.clone()))
        .collect()
}

/// [`StatsRepo::summary`] on an already open connection.
pub fn summary_in(conn: &mut SqliteConnection) -> RepoResult<DashboardSummary> {
    use diesel::dsl::{count, sum};
    use diesel::expression_methods::AggregateExpressionMethods;

    let total_games: i64 = os::olympic_stats
        .select(count(os::slug_game).aggregate_distinct())
        .first(conn)?;
    let total_countries: i64 = os::olympic_stats
        .select(count(os::country_code).aggregate_distinct())
        .first(conn)?;
    let total_athletes: Option<i64> = os::olympic_stats
        .select(sum(os::total_athletes))
        .first(conn)?;
    let total_medals: Option<i64> = os::olympic_stats
        .select(sum(os::total_medals))
        .first(conn)?;

    Ok(DashboardSummary {
        total_games,
        total_countries,
        total_athletes: total_athletes.unwrap_or(0),
        total_medals: total_medals.unwrap_or(0),
    })
}

/// [`StatsRepo::top_countries`] on an already open connection.
pub fn top_countries_in(conn: &mut SqliteConnection, limit: u32) -> RepoResult<Vec<CountryMedals>> {
    let rows = sql_query(
        "SELECT country_code, CAST(SUM(total_medals) AS INTEGER) AS medals
           FROM olympic_stats
          GROUP BY country_code
          ORDER BY medals DESC, country_code ASC
          LIMIT ?",
    )
    .bind::<BigInt, _>(i64::from(limit))
    .load::<CountryMedals>(conn)?;
    Ok(rows)
}

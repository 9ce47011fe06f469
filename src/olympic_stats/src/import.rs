//! Bulk CSV import: truncate the stats table and reload it from the dataset export.
//!
//! The whole reload runs inside a single **`BEGIN IMMEDIATE`** transaction via
//! `SqliteConnection::immediate_transaction`: readers keep seeing the previous table until the new
//! one is committed, and a failed insert leaves the old data untouched.
//!
//! Rows are validated one by one before anything is written. A row that fails to parse, or whose
//! gold + silver + bronze does not add up to `total_medals`, is rejected and logged; the import
//! carries on with the rest.

use std::{collections::HashSet, io::Read, path::Path};

use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::{SqliteConnection, prelude::*};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{models::NewStatsRow, schema::olympic_stats, season::Season};

/// Outcome of one reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows written.
    pub inserted: usize,
    /// Rows rejected during validation.
    pub rejected: usize,
    /// Inserted rows repeating an earlier (country, year, season) key.
    pub duplicate_keys: usize,
    /// When the reload started.
    pub started_at: DateTime<Utc>,
    /// When the transaction committed.
    pub finished_at: DateTime<Utc>,
}

/// One line of the dataset CSV, before validation.
///
/// Integer columns also accept float spellings such as `398.0`, which pandas writes for any
/// integer column that contains a missing value.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(deserialize_with = "integral")]
    year: i32,
    slug_game: String,
    #[serde(alias = "country_code")]
    country_3_letter_code: String,
    #[serde(deserialize_with = "integral")]
    bronze_medals: i32,
    #[serde(deserialize_with = "integral")]
    gold_medals: i32,
    #[serde(deserialize_with = "integral")]
    silver_medals: i32,
    #[serde(deserialize_with = "integral")]
    total_medals: i32,
    #[serde(default, deserialize_with = "optional_integral")]
    total_athletes: Option<i32>,
    avg_age_athletes: Option<f64>,
    #[serde(default, deserialize_with = "optional_integral")]
    medals_in_current_year: Option<i32>,
    #[serde(default)]
    game_slug: Option<String>,
    #[serde(default)]
    city: Option<String>,
    season: String,
    #[serde(default)]
    game_name: Option<String>,
    cumulative_medals: Option<f64>,
    #[serde(default, deserialize_with = "optional_integral")]
    is_host: Option<i32>,
}

fn to_integral<E: serde::de::Error>(v: f64) -> Result<i32, E> {
    if v.is_finite() && v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
        Ok(v as i32)
    } else {
        Err(E::custom(format!("expected a whole number, got {v}")))
    }
}

fn integral<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    to_integral(f64::deserialize(d)?)
}

fn optional_integral<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Option::<f64>::deserialize(d)?.map(to_integral).transpose()
}

/// Why a CSV line was rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RowRejection {
    /// The season is neither Summer nor Winter.
    #[error(transparent)]
    Season(#[from] crate::season::UnknownSeason),
    /// The country code is empty after trimming.
    #[error("empty country code")]
    EmptyCountry,
    /// A medal or athlete counter is negative.
    #[error("negative counter {0}")]
    NegativeCounter(&'static str),
    /// Medal breakdown does not add up.
    #[error("gold {gold} + silver {silver} + bronze {bronze} != total {total}")]
    MedalSum {
        /// Gold medals.
        gold: i32,
        /// Silver medals.
        silver: i32,
        /// Bronze medals.
        bronze: i32,
        /// Declared total.
        total: i32,
    },
    /// `is_host` is something other than 0 or 1.
    #[error("is_host must be 0 or 1, got {0}")]
    HostFlag(i32),
}

impl CsvRow {
    fn validate(self) -> Result<NewStatsRow, RowRejection> {
        let season: Season = self.season.parse()?;
        let country_code = self.country_3_letter_code.trim().to_ascii_uppercase();
        if country_code.is_empty() {
            return Err(RowRejection::EmptyCountry);
        }

        let total_athletes = self.total_athletes.unwrap_or(0);
        let medals_in_current_year = self.medals_in_current_year.unwrap_or(0);
        for (name, v) in [
            ("total_athletes", total_athletes),
            ("total_medals", self.total_medals),
            ("gold_medals", self.gold_medals),
            ("silver_medals", self.silver_medals),
            ("bronze_medals", self.bronze_medals),
            ("medals_in_current_year", medals_in_current_year),
        ] {
            if v < 0 {
                return Err(RowRejection::NegativeCounter(name));
            }
        }

        let breakdown = i64::from(self.gold_medals) + i64::from(self.silver_medals) + i64::from(self.bronze_medals);
        if breakdown != i64::from(self.total_medals) {
            return Err(RowRejection::MedalSum {
                gold: self.gold_medals,
                silver: self.silver_medals,
                bronze: self.bronze_medals,
                total: self.total_medals,
            });
        }

        let is_host = self.is_host.unwrap_or(0);
        if !(0..=1).contains(&is_host) {
            return Err(RowRejection::HostFlag(is_host));
        }

        Ok(NewStatsRow {
            year: self.year,
            season: season.as_db_str().to_string(),
            country_code,
            slug_game: self.slug_game.trim().to_string(),
            game_slug: self.game_slug.unwrap_or_default().trim().to_string(),
            game_name: self.game_name.unwrap_or_default().trim().to_string(),
            city: self.city.unwrap_or_default().trim().to_string(),
            total_athletes,
            total_medals: self.total_medals,
            gold_medals: self.gold_medals,
            silver_medals: self.silver_medals,
            bronze_medals: self.bronze_medals,
            medals_in_current_year,
            avg_age_athletes: self.avg_age_athletes.filter(|a| a.is_finite()),
            cumulative_medals: self.cumulative_medals.unwrap_or(0.0),
            is_host,
        })
    }
}

/// Rows that survived validation, plus the rejection count.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    /// Validated rows in file order.
    pub rows: Vec<NewStatsRow>,
    /// Lines that were rejected.
    pub rejected: usize,
}

/// Parse and validate dataset CSV from any reader.
pub fn parse_csv<R: Read>(reader: R) -> anyhow::Result<ParsedCsv> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = ParsedCsv::default();

    for (idx, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e).context("read dataset CSV"),
            Err(e) => {
                tracing::warn!(line, error = %e, "rejecting unparsable CSV row");
                out.rejected += 1;
                continue;
            }
        };
        let label = format!("{}-{}", row.slug_game, row.country_3_letter_code);
        match row.validate() {
            Ok(new_row) => out.rows.push(new_row),
            Err(e) => {
                tracing::warn!(line, row = %label, error = %e, "rejecting CSV row");
                out.rejected += 1;
            }
        }
    }
    Ok(out)
}

/// Replace the whole table with `rows` in one immediate transaction.
pub fn reload(conn: &mut SqliteConnection, rows: &[NewStatsRow]) -> anyhow::Result<usize> {
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let removed = diesel::delete(olympic_stats::table).execute(conn)?;
        tracing::debug!(removed, "cleared olympic_stats");
        let mut inserted = 0;
        for chunk in rows.chunks(500) {
            inserted += diesel::insert_into(olympic_stats::table)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// Count rows repeating an earlier (country, year, season) key.
pub fn count_duplicate_keys(rows: &[NewStatsRow]) -> usize {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|r| !seen.insert((r.country_code.as_str(), r.year, r.season.as_str())))
        .count()
}

/// Read the dataset CSV at `path` and reload the table from it.
pub fn import_csv(conn: &mut SqliteConnection, path: impl AsRef<Path>) -> anyhow::Result<ImportReport> {
    let started_at = Utc::now();
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("open dataset CSV {}", path.as_ref().display()))?;
    let parsed = parse_csv(file)?;

    let duplicate_keys = count_duplicate_keys(&parsed.rows);
    if duplicate_keys > 0 {
        tracing::warn!(duplicate_keys, "dataset repeats (country, year, season) keys; first row wins on read");
    }

    let inserted = reload(conn, &parsed.rows)?;
    let report = ImportReport {
        inserted,
        rejected: parsed.rejected,
        duplicate_keys,
        started_at,
        finished_at: Utc::now(),
    };
    tracing::info!(inserted, rejected = report.rejected, duplicate_keys, "import completed");
    Ok(report)
}

//! Diesel models mapping to the database schema, plus the domain record built from them.
//!
//! [`StatsRow`] mirrors [`crate::schema::olympic_stats`] column for column (SQLite integers are
//! `i32`, the season is raw text). [`StatsRecord`] is what the rest of the system consumes:
//! counters are unsigned, the season is typed and `is_host` is a `bool`. The conversion between
//! the two is the only place where malformed rows are detected.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::olympic_stats;
use crate::season::Season;

/// A row in [`crate::schema::olympic_stats`]: one country at one Games edition.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = olympic_stats, check_for_backend(diesel::sqlite::Sqlite))]
pub struct StatsRow {
    /// Database primary key; follows import order.
    pub id: i32,
    /// Edition year (e.g., 2020).
    pub year: i32,
    /// "Summer" or "Winter" (CHECK constrained).
    pub season: String,
    /// Three-letter country / team code (e.g., "USA", "URS").
    pub country_code: String,
    /// Edition identifier (e.g., "tokyo-2020").
    pub slug_game: String,
    /// Secondary edition identifier carried by the source dataset.
    pub game_slug: String,
    /// Edition display name (e.g., "Tokyo 2020").
    pub game_name: String,
    /// Host city.
    pub city: String,
    /// Athletes entered by this country.
    pub total_athletes: i32,
    /// Medals won (gold + silver + bronze).
    pub total_medals: i32,
    /// Gold medals won.
    pub gold_medals: i32,
    /// Silver medals won.
    pub silver_medals: i32,
    /// Bronze medals won.
    pub bronze_medals: i32,
    /// Medals credited to the edition year by the source dataset.
    pub medals_in_current_year: i32,
    /// Mean athlete age; NULL when the source had no ages.
    pub avg_age_athletes: Option<f64>,
    /// Running medal total across this country's editions.
    pub cumulative_medals: f64,
    /// 1 when the country hosted this edition.
    pub is_host: i32,
}

/// Insertable form of [`StatsRow`] used by the bulk importer.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = olympic_stats)]
pub struct NewStatsRow {
    /// Edition year.
    pub year: i32,
    /// "Summer" or "Winter".
    pub season: String,
    /// Upper-cased country code.
    pub country_code: String,
    /// Edition identifier.
    pub slug_game: String,
    /// Secondary edition identifier.
    pub game_slug: String,
    /// Edition display name.
    pub game_name: String,
    /// Host city.
    pub city: String,
    /// Athletes entered.
    pub total_athletes: i32,
    /// Medals won.
    pub total_medals: i32,
    /// Gold medals won.
    pub gold_medals: i32,
    /// Silver medals won.
    pub silver_medals: i32,
    /// Bronze medals won.
    pub bronze_medals: i32,
    /// Medals credited to the edition year.
    pub medals_in_current_year: i32,
    /// Mean athlete age, if known.
    pub avg_age_athletes: Option<f64>,
    /// Running medal total.
    pub cumulative_medals: f64,
    /// 1 when the country hosted this edition.
    pub is_host: i32,
}

/// One country's statistics at one Games edition, as consumed by forecasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Row identity (import order); breaks ties between duplicate rows.
    pub id: i32,
    /// Three-letter country / team code.
    pub country_code: String,
    /// Edition year.
    pub year: i32,
    /// Edition season.
    pub season: Season,
    /// Edition display name.
    pub game_name: String,
    /// Host city.
    pub city: String,
    /// Edition identifier.
    pub slug_game: String,
    /// Athletes entered.
    pub total_athletes: u32,
    /// Medals won.
    pub total_medals: u32,
    /// Gold medals won.
    pub gold_medals: u32,
    /// Silver medals won.
    pub silver_medals: u32,
    /// Bronze medals won.
    pub bronze_medals: u32,
    /// Medals credited to the edition year.
    pub medals_in_current_year: u32,
    /// Mean athlete age, if known.
    pub avg_age_athletes: Option<f64>,
    /// Running medal total across editions.
    pub cumulative_medals: f64,
    /// Whether the country hosted this edition.
    pub is_host: bool,
}

impl StatsRecord {
    /// A record with every metric zeroed; handy for fixtures and callers that fill fields by hand.
    pub fn new(country_code: impl Into<String>, year: i32, season: Season) -> Self {
        Self {
            id: 0,
            country_code: country_code.into(),
            year,
            season,
            game_name: String::new(),
            city: String::new(),
            slug_game: String::new(),
            total_athletes: 0,
            total_medals: 0,
            gold_medals: 0,
            silver_medals: 0,
            bronze_medals: 0,
            medals_in_current_year: 0,
            avg_age_athletes: None,
            cumulative_medals: 0.0,
            is_host: false,
        }
    }
}

/// Why a [`StatsRow`] could not become a [`StatsRecord`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RowError {
    /// The season column holds something other than Summer/Winter.
    #[error("row {id}: {source}")]
    Season {
        /// Offending row.
        id: i32,
        /// Parse failure.
        source: crate::season::UnknownSeason,
    },
    /// A counter column is negative.
    #[error("row {id}: {column} is negative ({value})")]
    NegativeCounter {
        /// Offending row.
        id: i32,
        /// Column name.
        column: &'static str,
        /// Stored value.
        value: i32,
    },
}

fn counter(id: i32, column: &'static str, value: i32) -> Result<u32, RowError> {
    u32::try_from(value).map_err(|_| RowError::NegativeCounter { id, column, value })
}

impl TryFrom<StatsRow> for StatsRecord {
    type Error = RowError;

    fn try_from(row: StatsRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let season = row
            .season
            .parse()
            .map_err(|source| RowError::Season { id, source })?;
        Ok(Self {
            id,
            country_code: row.country_code,
            year: row.year,
            season,
            game_name: row.game_name,
            city: row.city,
            slug_game: row.slug_game,
            total_athletes: counter(id, "total_athletes", row.total_athletes)?,
            total_medals: counter(id, "total_medals", row.total_medals)?,
            gold_medals: counter(id, "gold_medals", row.gold_medals)?,
            silver_medals: counter(id, "silver_medals", row.silver_medals)?,
            bronze_medals: counter(id, "bronze_medals", row.bronze_medals)?,
            medals_in_current_year: counter(id, "medals_in_current_year", row.medals_in_current_year)?,
            avg_age_athletes: row.avg_age_athletes,
            cumulative_medals: row.cumulative_medals,
            is_host: row.is_host != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> StatsRow {
        StatsRow {
            id: 7,
            year: 2020,
            season: "Summer".into(),
            country_code: "FRA".into(),
            slug_game: "tokyo-2020".into(),
            game_slug: "tokyo-2020".into(),
            game_name: "Tokyo 2020".into(),
            city: "Tokyo".into(),
            total_athletes: 398,
            total_medals: 33,
            gold_medals: 10,
            silver_medals: 12,
            bronze_medals: 11,
            medals_in_current_year: 33,
            avg_age_athletes: None,
            cumulative_medals: 751.0,
            is_host: 0,
        }
    }

    #[test]
    fn converts_valid_row() {
        let rec = StatsRecord::try_from(row()).unwrap();
        assert_eq!(rec.season, Season::Summer);
        assert_eq!(rec.total_athletes, 398);
        assert!(!rec.is_host);
        assert_eq!(rec.avg_age_athletes, None);
    }

    #[test]
    fn negative_counter_is_reported() {
        let mut r = row();
        r.total_medals = -1;
        assert_eq!(
            StatsRecord::try_from(r).unwrap_err(),
            RowError::NegativeCounter {
                id: 7,
                column: "total_medals",
                value: -1
            }
        );
    }

    #[test]
    fn record_serializes_with_typed_fields() {
        let mut r = row();
        r.is_host = 1;
        r.avg_age_athletes = Some(27.1);
        let rec = StatsRecord::try_from(r).unwrap();
        insta::assert_json_snapshot!(rec, @r#"
        {
          "id": 7,
          "country_code": "FRA",
          "year": 2020,
          "season": "Summer",
          "game_name": "Tokyo 2020",
          "city": "Tokyo",
          "slug_game": "tokyo-2020",
          "total_athletes": 398,
          "total_medals": 33,
          "gold_medals": 10,
          "silver_medals": 12,
          "bronze_medals": 11,
          "medals_in_current_year": 33,
          "avg_age_athletes": 27.1,
          "cumulative_medals": 751.0,
          "is_host": true
        }
        "#);
    }
}

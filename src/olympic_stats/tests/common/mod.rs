#![allow(dead_code)]

use std::time::Duration;

use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use olympic_stats::db::{connection, migrate};
use olympic_stats::models::NewStatsRow;
use olympic_stats::schema::olympic_stats as os;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_all(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path, Duration::from_millis(5000)).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

/// Minimal Summer row; callers override the fields they care about.
pub fn row(code: &str, year: i32, season: &str) -> NewStatsRow {
    NewStatsRow {
        year,
        season: season.to_string(),
        country_code: code.to_string(),
        slug_game: format!("games-{year}-{}", season.to_lowercase()),
        game_slug: String::new(),
        game_name: format!("Games {year}"),
        city: String::new(),
        total_athletes: 0,
        total_medals: 0,
        gold_medals: 0,
        silver_medals: 0,
        bronze_medals: 0,
        medals_in_current_year: 0,
        avg_age_athletes: None,
        cumulative_medals: 0.0,
        is_host: 0,
    }
}

pub fn with_medals(mut r: NewStatsRow, gold: i32, silver: i32, bronze: i32) -> NewStatsRow {
    r.gold_medals = gold;
    r.silver_medals = silver;
    r.bronze_medals = bronze;
    r.total_medals = gold + silver + bronze;
    r
}

pub fn insert(conn: &mut SqliteConnection, rows: &[NewStatsRow]) {
    for r in rows {
        diesel::insert_into(os::table).values(r).execute(conn).expect("insert row");
    }
}

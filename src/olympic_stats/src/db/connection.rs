//! SQLite connection helpers.
//!
//! [`connect_sqlite`] opens a connection and applies the PRAGMAs every caller relies on:
//! WAL journaling, foreign_keys=ON and a bounded busy_timeout. A reader blocked on a writer
//! gives up after the timeout instead of waiting forever.

use std::{path::Path, time::Duration};

use diesel::{Connection, ConnectionError, SqliteConnection, connection::SimpleConnection};

/// Default bound on how long a statement waits for a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str, busy_timeout: Duration) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(strip_scheme(database_url))?;
    apply_pragmas(&mut conn, busy_timeout)?;
    Ok(conn)
}

/// Open an existing database for reading.
///
/// Unlike [`connect_sqlite`], a plain file path that does not exist is refused instead of
/// silently creating an empty database.
pub fn connect_existing(
    database_url: &str,
    busy_timeout: Duration,
) -> Result<SqliteConnection, ConnectionError> {
    let url = strip_scheme(database_url);
    if is_plain_path(url) && !Path::new(url).exists() {
        return Err(ConnectionError::BadConnection(format!(
            "database file {url} does not exist"
        )));
    }
    let mut conn = SqliteConnection::establish(url)?;
    apply_pragmas(&mut conn, busy_timeout)
        .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
    Ok(conn)
}

fn apply_pragmas(conn: &mut SqliteConnection, busy_timeout: Duration) -> diesel::QueryResult<()> {
    conn.batch_execute(&pragma_batch(busy_timeout))
}

/// busy_timeout goes first so the journal-mode switch already waits on a locked file.
fn pragma_batch(busy_timeout: Duration) -> String {
    let millis = busy_timeout.as_millis().min(i32::MAX as u128);
    format!("PRAGMA busy_timeout={millis}; PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
}

/// Drop a leading `sqlite://` or `sqlite:` so the remainder can be handed to SQLite.
pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

fn is_plain_path(url: &str) -> bool {
    !(url == ":memory:" || url.starts_with("file:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_existing_refuses_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.db");
        let Err(err) = connect_existing(missing.to_str().unwrap(), DEFAULT_BUSY_TIMEOUT) else {
            panic!("missing database file must be refused");
        };
        assert!(err.to_string().contains("does not exist"));
        assert!(!missing.exists(), "read path must not create the database");
    }

    #[test]
    fn busy_timeout_is_applied_before_journal_mode() {
        let batch = pragma_batch(Duration::from_millis(1500));
        assert!(batch.starts_with("PRAGMA busy_timeout=1500;"), "{batch}");
        assert!(batch.contains("journal_mode=WAL"));
    }

    #[test]
    fn memory_urls_are_not_paths() {
        assert!(!is_plain_path(":memory:"));
        assert!(!is_plain_path("file:stats.db?mode=ro"));
        assert!(is_plain_path("data/olympics.db"));
        assert_eq!(strip_scheme("sqlite://data/olympics.db"), "data/olympics.db");
        assert_eq!(strip_scheme("sqlite:data/olympics.db"), "data/olympics.db");
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use olympic_stats::{
    StatsRepo,
    db::{connection::connect_sqlite, migrate},
    import::import_csv,
    repo::SqliteStatsRepo,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Olympic stats store CLI")]
struct Cli {
    /// SQLite database path (falls back to DATABASE_URL)
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    /// Busy timeout applied to every connection, in milliseconds
    #[arg(long, default_value = "5000")]
    busy_timeout_ms: u64,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply embedded migrations
    Migrate,
    /// Truncate the stats table and reload it from a dataset CSV
    Import {
        #[arg(long, value_name = "FILE")]
        csv: String,
    },
    /// Print dashboard headline figures and the all-time medal table
    Summary {
        #[arg(long, default_value = "10")]
        top: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_url = match cli.database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL").context("pass --database-url or set DATABASE_URL")?,
    };
    let timeout = Duration::from_millis(cli.busy_timeout_ms);

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_all(&db_url)?;
            tracing::info!(%db_url, "migrations applied");
        }
        Cmd::Import { csv } => {
            migrate::run_all(&db_url)?;
            let mut conn = connect_sqlite(&db_url, timeout)?;
            let report = import_csv(&mut conn, &csv)?;
            println!("{}", render_report(&report));
        }
        Cmd::Summary { top } => {
            let repo = SqliteStatsRepo::with_timeout(db_url, timeout);
            let summary = repo.summary()?;
            println!("editions:       {}", summary.total_games);
            println!("countries:      {}", summary.total_countries);
            println!("participations: {}", summary.total_athletes);
            println!("medals:         {}", summary.total_medals);
            println!();
            for (rank, row) in repo.top_countries(top)?.iter().enumerate() {
                println!("{:>3}. {:<4} {:>6}", rank + 1, row.country_code, row.medals);
            }
        }
    }

    Ok(())
}

fn render_report(report: &olympic_stats::import::ImportReport) -> String {
    format!(
        "inserted={} rejected={} duplicate_keys={} elapsed_ms={}",
        report.inserted,
        report.rejected,
        report.duplicate_keys,
        (report.finished_at - report.started_at).num_milliseconds()
    )
}

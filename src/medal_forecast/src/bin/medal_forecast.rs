use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medal_forecast::{
    Forecast, Orchestrator,
    config::{ForecastConfig, load_config_path},
    features::RULES_VERSION,
    model::artifact::read_artifact,
    orchestrator::Edition,
    reconcile::{compare, read_results_path},
};
use olympic_stats::{Season, SqliteStatsRepo};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Olympic medal forecast CLI")]
struct Cli {
    /// Forecast configuration (TOML); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// SQLite database path (overrides DATABASE_URL and the config file)
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Args)]
struct EditionArgs {
    /// Edition year (defaults to [edition].year)
    #[arg(long)]
    year: Option<i32>,
    /// Summer or Winter (defaults to [edition].season)
    #[arg(long)]
    season: Option<Season>,
    /// Host country code (defaults to [edition].host)
    #[arg(long)]
    host: Option<String>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Forecast medal counts per country
    Predict {
        #[command(flatten)]
        edition: EditionArgs,
        /// Emit the full forecast as JSON
        #[arg(long)]
        json: bool,
        /// Rows to print in table mode
        #[arg(long, default_value = "25")]
        top: usize,
    },
    /// Forecast, then compare against an authoritative results CSV
    Compare {
        #[command(flatten)]
        edition: EditionArgs,
        /// CSV with a name column and a total column
        #[arg(long, value_name = "FILE")]
        results: String,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Describe every configured model artifact
    Inspect,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => ForecastConfig::default(),
    };
    if let Some(url) = cli.database_url.or_else(|| std::env::var("DATABASE_URL").ok()) {
        cfg.database.url = url;
    }

    match cli.cmd {
        Cmd::Predict { edition, json, top } => {
            let forecast = run_forecast(&cfg, &edition)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&forecast)?);
            } else {
                print_forecast(&forecast, top);
            }
        }
        Cmd::Compare { edition, results, json } => {
            let forecast = run_forecast(&cfg, &edition)?;
            let names = cfg.country_names()?;
            let authoritative = read_results_path(&results)?;
            let rows = compare(&forecast.results, &authoritative, &names);
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{:<5} {:>9} {:>6} {:>6}  status", "code", "predicted", "real", "diff");
                for r in &rows {
                    println!(
                        "{:<5} {:>9} {:>6} {:>+6}  {}",
                        r.country_code,
                        r.predicted,
                        r.real,
                        r.diff,
                        r.status.as_str()
                    );
                }
            }
        }
        Cmd::Inspect => inspect(&cfg),
    }

    Ok(())
}

fn run_forecast(cfg: &ForecastConfig, args: &EditionArgs) -> Result<Forecast> {
    let base = cfg.edition.edition();
    let edition = Edition::new(
        args.year.unwrap_or(base.year),
        args.season.unwrap_or(base.season),
        args.host.as_deref().unwrap_or(&base.host),
    );
    let repo = SqliteStatsRepo::with_timeout(&cfg.database.url, cfg.database.busy_timeout());
    let registry = cfg.model_registry();
    let eligibility = cfg.eligibility_filter();
    Orchestrator::new(&repo, &registry, &eligibility)
        .predict(&edition)
        .with_context(|| format!("forecast {} {} (database {})", edition.year, edition.season, cfg.database.url))
}

fn print_forecast(forecast: &Forecast, top: usize) {
    let e = &forecast.edition;
    println!("{} {} Games, host {}", e.year, e.season, e.host);
    for m in &forecast.models {
        if m.available {
            println!(
                "  model {:<8} {:<17} proxied={:?} unmapped={:?} failed={}",
                m.name, m.family, m.proxied_features, m.unmapped_features, m.failed_predictions
            );
        } else {
            println!(
                "  model {:<8} {:<17} UNAVAILABLE ({})",
                m.name,
                m.family,
                m.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    if forecast.degraded {
        println!("  (degraded forecast)");
    }
    println!();
    for (rank, r) in forecast.results.iter().take(top).enumerate() {
        let per_model: Vec<String> = r.predictions.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!(
            "{:>3}. {:<4} {:>4}   [{}] athletes={} ({})",
            rank + 1,
            r.country_code,
            r.consensus,
            per_model.join(" "),
            r.baseline_athletes,
            r.baseline_year
        );
    }
}

fn inspect(cfg: &ForecastConfig) {
    let registry = cfg.model_registry();
    println!("feature rules v{RULES_VERSION}");
    for entry in registry.entries() {
        let path = registry.artifact_path(entry);
        println!("{} ({}) {}", entry.name, entry.family, path.display());
        match read_artifact(&path) {
            Ok((artifact, format)) => {
                println!("  format:   {format}");
                println!("  family:   {}", artifact.family);
                println!("  trees:    {}", artifact.trees.len());
                match (&artifact.feature_names, &entry.fallback_features) {
                    (Some(names), _) => println!("  features: {}", names.join(", ")),
                    (None, Some(names)) => println!("  features: {} (configured fallback)", names.join(", ")),
                    (None, None) => println!("  features: none declared"),
                }
            }
            Err(e) => println!("  error:    {e}"),
        }
    }
    println!("proxies:");
    for (name, proxy) in cfg.rule_table().proxies() {
        println!("  {name:<24} {}", proxy.note);
    }
}

//! callscope - Model performance and call quality analytics
//!
//! Imports call records into the local store and reports on them, either
//! from the local SQLite store or from the hosted backend.

mod render;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use callscope_core::analytics::filter_by_accuracy;
use callscope_core::config::{AnalyticsConfig, SourceKind};
use callscope_core::source::CallRow;
use callscope_core::{
    parse_date_bound, AnalyticsRequest, AnalyticsService, CallRecord, CallSource, Config, Database,
    DateBound, Granularity, ModelCategory, RestSource,
};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "callscope")]
#[command(about = "Model performance and call quality analytics for AI call centers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the full analytics report for a date range
    Report(ReportArgs),

    /// Run a Welch's t-test between two models
    Compare {
        /// First model identifier (e.g., gpt-4 or elevenlabs/turbo-v2)
        model_a: String,

        /// Second model identifier
        model_b: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Import call rows (as exported by the hosted backend) into the local store
    Import {
        /// JSON file holding an array of call rows
        file: PathBuf,

        /// SQLite database path (defaults to the configured store)
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ReportArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Only analyze calls handled by this model
    #[arg(short, long)]
    model: Option<String>,

    /// Drop models whose average accuracy is below this value
    #[arg(long)]
    min_accuracy: Option<f64>,
}

/// Options shared by every analytics command.
#[derive(Args)]
struct ScopeArgs {
    /// Start of the range (ISO-8601; defaults to the configured lookback)
    #[arg(long)]
    start: Option<String>,

    /// End of the range (ISO-8601; defaults to now)
    #[arg(long)]
    end: Option<String>,

    /// Only analyze calls for this client
    #[arg(long)]
    client: Option<String>,

    /// Model category: llm, voice, or transcriber
    #[arg(long, default_value = "llm")]
    category: ModelCategory,

    /// Trend granularity: daily, weekly, or monthly
    #[arg(long)]
    granularity: Option<Granularity>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Read from this SQLite database instead of the configured source
    #[arg(long)]
    database: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        callscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    match cli.command {
        Command::Import { file, database } => import(&config, &file, database.as_deref()),
        Command::Report(args) => {
            let runtime = build_runtime()?;
            runtime.block_on(report(&config, args))
        }
        Command::Compare {
            model_a,
            model_b,
            scope,
        } => {
            let runtime = build_runtime()?;
            runtime.block_on(compare(&config, &model_a, &model_b, scope))
        }
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

async fn report(config: &Config, args: ReportArgs) -> Result<()> {
    let json = wants_json(&args.scope.format)?;
    let mut request = build_request(&args.scope, &config.analytics)?;
    if let Some(model) = args.model {
        request = request.with_model(model);
    }

    let service = AnalyticsService::with_config(
        open_source(config, args.scope.database.as_deref())?,
        config.analytics.clone(),
    );
    let mut report = service
        .generate_report(&request)
        .await
        .context("failed to generate report")?;

    if let Some(threshold) = args.min_accuracy {
        report.model_performance = filter_by_accuracy(&report.model_performance, threshold);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }
    Ok(())
}

async fn compare(config: &Config, model_a: &str, model_b: &str, scope: ScopeArgs) -> Result<()> {
    let json = wants_json(&scope.format)?;
    let request = build_request(&scope, &config.analytics)?;

    let service = AnalyticsService::with_config(
        open_source(config, scope.database.as_deref())?,
        config.analytics.clone(),
    );
    let comparison = service
        .compare_models(&request, model_a, model_b)
        .await
        .context("failed to compare models")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        render::print_comparison(&comparison);
    }
    Ok(())
}

fn import(config: &Config, file: &Path, database: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let rows: Vec<CallRow> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse call rows from {}", file.display()))?;
    let calls: Vec<CallRecord> = rows.into_iter().map(CallRow::into_record).collect();

    let db_path = database
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.source.resolved_database_path());
    let db = open_database(&db_path)?;
    let imported = db.insert_calls(&calls).context("failed to import calls")?;

    tracing::info!(file = %file.display(), imported, "Imported call rows");
    println!("Imported {} call(s) into {}", imported, db_path.display());
    Ok(())
}

fn wants_json(format: &str) -> Result<bool> {
    match format {
        "json" => Ok(true),
        "text" => Ok(false),
        other => bail!("unknown output format '{}': expected text or json", other),
    }
}

/// Resolve CLI range options into a request, applying configured defaults.
fn build_request(scope: &ScopeArgs, analytics: &AnalyticsConfig) -> Result<AnalyticsRequest> {
    let end = match &scope.end {
        Some(value) => parse_date_bound(value, DateBound::End)?,
        None => Utc::now(),
    };
    let start = match &scope.start {
        Some(value) => parse_date_bound(value, DateBound::Start)?,
        None => end - Duration::days(analytics.default_lookback_days),
    };

    let mut request = AnalyticsRequest::new(start, end)?
        .with_category(scope.category)
        .with_granularity(scope.granularity.unwrap_or(analytics.default_granularity));
    if let Some(client) = &scope.client {
        request = request.with_client(client.clone());
    }
    Ok(request)
}

/// Pick the call source: an explicit database wins, then the configured kind.
fn open_source(config: &Config, database: Option<&Path>) -> Result<Box<dyn CallSource>> {
    if let Some(path) = database {
        return Ok(Box::new(open_database(path)?));
    }

    match config.source.kind {
        SourceKind::Sqlite => Ok(Box::new(open_database(
            &config.source.resolved_database_path(),
        )?)),
        SourceKind::Rest => {
            let source =
                RestSource::new(&config.source).context("failed to create hosted source")?;
            Ok(Box::new(source))
        }
    }
}

fn open_database(path: &Path) -> Result<Database> {
    tracing::info!(path = %path.display(), "Opening database");

    let db = Database::open(path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(db)
}

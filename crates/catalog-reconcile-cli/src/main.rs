//! catalog-reconcile CLI - consistency checks between the catalog database and its search index.

use catalog_reconcile::{
    CatalogEntityKind, Config, EntityId, NoOpReportSink, ReconcileError, Reconciler,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "catalog-reconcile")]
#[command(about = "Consistency checks between the catalog database and its search index")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (falls back to MYSQL_*/MONGODB_* environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Override the directory mismatch reports are written to
    #[arg(long)]
    report_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare live ID sets and spot-check last_modified_time
    Ids {
        /// Entity kind to check (repeatable) [default: all kinds]
        #[arg(long = "kind", value_parser = parse_kind)]
        kinds: Vec<CatalogEntityKind>,

        /// Liveness cutoff as a Unix timestamp; only rows with schedule_end_time after it are compared
        #[arg(long)]
        cutoff: i64,

        /// Do not write report files
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-run the catalog ETL for specific IDs and diff against the index
    Diff {
        /// Entity kind
        #[arg(long, value_parser = parse_kind)]
        kind: CatalogEntityKind,

        /// Comma-separated entity IDs
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<EntityId>,
    },

    /// Test database connections
    HealthCheck,
}

fn parse_kind(value: &str) -> Result<CatalogEntityKind, String> {
    value.parse().map_err(|e: ReconcileError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), ReconcileError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            let config = Config::from_env()?;
            info!("Loaded configuration from environment");
            config
        }
    }
    .with_auto_tuning();

    if let Some(dir) = cli.report_dir {
        config.reconcile.report_dir = dir;
    }

    // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler();

    let reconciler = Reconciler::connect(&config).await?;
    execute(cli.command, cli.output_json, &config, reconciler, &cancel_token).await
}

async fn execute(
    command: Commands,
    output_json: bool,
    config: &Config,
    reconciler: Reconciler,
    cancel_token: &CancellationToken,
) -> Result<(), ReconcileError> {
    let reconciler = match &command {
        Commands::Ids { dry_run: true, .. } => {
            reconciler.with_sink(Arc::new(NoOpReportSink::new()))
        }
        _ => reconciler,
    };

    let result = run_command(command, output_json, config, &reconciler, cancel_token).await;
    reconciler.close().await;
    result
}

async fn run_command(
    command: Commands,
    output_json: bool,
    config: &Config,
    reconciler: &Reconciler,
    cancel_token: &CancellationToken,
) -> Result<(), ReconcileError> {
    match command {
        Commands::Ids {
            kinds,
            cutoff,
            dry_run,
        } => {
            let kinds = if kinds.is_empty() {
                CatalogEntityKind::ALL.to_vec()
            } else {
                kinds
            };

            let mut outcomes = Vec::with_capacity(kinds.len());
            for kind in kinds {
                let outcome = reconciler
                    .run_id_reconciliation(kind, cutoff, cancel_token)
                    .await?;
                outcomes.push(outcome);
            }

            if output_json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                for outcome in &outcomes {
                    let report = &outcome.report;
                    println!("{} (run {}):", outcome.entity_kind, outcome.run_id);
                    println!("  Relational live IDs: {}", report.relational_count);
                    println!("  Document live IDs:   {}", report.document_count);
                    println!(
                        "  Only in relational:  {}",
                        report.only_in_relational.len()
                    );
                    println!("  Only in document:    {}", report.only_in_document.len());
                    println!("  Modified-time drift: {}", outcome.field_diffs.len());
                    println!("  Duration:            {:.1}s", outcome.duration_seconds);
                }
                if !dry_run {
                    println!(
                        "\nReports written to {}",
                        config.reconcile.report_dir.display()
                    );
                }
            }
        }

        Commands::Diff { kind, ids } => {
            let result = reconciler.run_record_diff(kind, &ids).await?;

            if output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.is_empty() {
                println!("No differences for {} {} IDs", ids.len(), kind);
            } else {
                for (id, fields) in &result {
                    println!("{} {}:", kind, id);
                    for (field, values) in fields {
                        println!(
                            "  {}: relational={} document={}",
                            field,
                            display_side(&values.left),
                            display_side(&values.right)
                        );
                    }
                }
            }
        }

        Commands::HealthCheck => {
            let result = reconciler.health_check().await?;

            if output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Relational (MySQL): {} ({}ms)",
                    if result.relational_connected { "OK" } else { "FAILED" },
                    result.relational_latency_ms
                );
                if let Some(ref err) = result.relational_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Document (MongoDB): {} ({}ms)",
                    if result.document_connected { "OK" } else { "FAILED" },
                    result.document_latency_ms
                );
                if let Some(ref err) = result.document_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(ReconcileError::store_unavailable(
                    if result.relational_connected { "document" } else { "relational" },
                    "health check failed",
                ));
            }
        }
    }

    Ok(())
}

fn display_side(value: &Option<catalog_reconcile::FieldValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<absent>".to_string(),
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
/// The reconciler observes it between steps.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Stopping after the current step...", name);
                    token.cancel();
                }
                Err(e) => eprintln!("Failed to install {} handler: {}", name, e),
            }
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nReceived Ctrl-C. Stopping after the current step...");
                token.cancel();
            }
            Err(e) => eprintln!("Failed to install Ctrl-C handler: {}", e),
        }
    });

    cancel_token
}

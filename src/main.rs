//! CLI entry point for the GMAO completeness audit.
//!
//! Provides subcommands for auditing an export directory, querying a written
//! report for one site, and listing the sources a run would read.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use gmao_completeness::audit::pipeline::run_audit;
use gmao_completeness::audit::types::{ScoringMode, TierScheme, UnknownTypePolicy};
use gmao_completeness::config::AuditConfig;
use gmao_completeness::output::{log_summary, read_report, write_report};
use gmao_completeness::publish::publish_report;
use gmao_completeness::source::{DirectoryCatalog, SourceCatalog};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gmao_completeness")]
#[command(about = "Audits GMAO equipment exports for missing attributes per site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit every equipment table of a directory and write the report
    Audit {
        /// Directory containing one CSV export per equipment type
        #[arg(short = 'd', long, default_value = "donnees")]
        source_dir: PathBuf,

        /// JSON configuration (path or URL) holding the expected attribute table
        #[arg(short, long)]
        config: Option<String>,

        /// Directory to write rapport.json and the CSV tables to
        #[arg(short, long, default_value = "rapport")]
        output_dir: PathBuf,

        /// Maximum number of sources read concurrently
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Override the scoring mode from the configuration
        #[arg(long, value_enum)]
        scoring: Option<ScoringMode>,

        /// Override the tier thresholds from the configuration
        #[arg(long, value_enum)]
        tiers: Option<TierScheme>,

        /// Override how equipment types missing from the table are scored
        #[arg(long, value_enum)]
        unknown_types: Option<UnknownTypePolicy>,

        /// Optional: S3 bucket to upload the report to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Key prefix for S3 uploads
        #[arg(long, default_value = "gmao-completeness")]
        s3_prefix: String,

        /// Optional: Gzip compress files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Show the completeness and missing attributes of one site
    Site {
        /// Site code (first characters of the location)
        #[arg(value_name = "SITE")]
        site: String,

        /// Report written by the audit command
        #[arg(short, long, default_value = "rapport/rapport.json")]
        report: PathBuf,
    },
    /// List the equipment tables an audit would read
    ListSources {
        #[arg(short = 'd', long, default_value = "donnees")]
        source_dir: PathBuf,

        /// JSON configuration (path or URL) holding the expected attribute table
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gmao_completeness.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gmao_completeness.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Audit {
            source_dir,
            config,
            output_dir,
            concurrency,
            scoring,
            tiers,
            unknown_types,
            s3_bucket,
            s3_prefix,
            gzip,
        } => {
            let mut config = load_config(config.as_deref()).await?;
            if let Some(scoring) = scoring {
                config.scoring = scoring;
            }
            if let Some(tiers) = tiers {
                config.tiers = tiers;
            }
            if let Some(unknown_types) = unknown_types {
                config.unknown_types = unknown_types;
            }

            info!(
                source_dir = %source_dir.display(),
                scoring = ?config.scoring,
                tiers = ?config.tiers,
                unknown_types = ?config.unknown_types,
                "Starting audit"
            );

            let catalog = Arc::new(DirectoryCatalog::new(&source_dir));
            let report = run_audit(catalog, Arc::new(config), concurrency).await?;

            log_summary(&report);
            let paths = write_report(&output_dir, &report)?;
            info!(output_dir = %output_dir.display(), files = paths.len(), "Report written");

            if let Some(bucket) = s3_bucket {
                info!(bucket = %bucket, gzip, "S3 upload enabled");
                let aws = aws_config::load_from_env().await;
                let s3 = aws_sdk_s3::Client::new(&aws);
                publish_report(
                    &s3,
                    &bucket,
                    &s3_prefix,
                    Utc::now().date_naive(),
                    &paths,
                    gzip,
                )
                .await?;
            }
        }
        Commands::Site { site, report } => {
            let report = read_report(&report)?;

            match report.completeness_for_site(&site) {
                Some(score) => info!(
                    site = %score.site,
                    total_expected = score.total_expected,
                    total_missing = score.total_missing,
                    rate_percent = score.rate_percent,
                    tier = %score.tier,
                    "Completeness"
                ),
                None => warn!(site = %site, "Site not present in report"),
            }

            let groups = report.missing_for_site(&site);
            if groups.is_empty() {
                info!(site = %site, "No missing attribute for this site");
            }
            for group in &groups {
                info!(
                    equipment_type = %group.equipment_type,
                    equipment = %group.label,
                    missing = %group.missing_attributes.join(", "),
                    "Missing attributes"
                );
            }
        }
        Commands::ListSources { source_dir, config } => {
            let config = load_config(config.as_deref()).await?;
            let catalog = DirectoryCatalog::new(&source_dir);
            let sources = catalog.list_sources().await?;

            info!(total = sources.len(), "Source list fetched");

            for source in &sources {
                let equipment_type = source.equipment_type();
                match config.expected.get(&equipment_type) {
                    Some(expected) => info!(
                        file = %source.name,
                        equipment_type = %equipment_type,
                        expected,
                        "Source"
                    ),
                    None => warn!(
                        file = %source.name,
                        equipment_type = %equipment_type,
                        "Source without expected attribute count"
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Loads the configuration, or falls back to defaults with an empty table.
async fn load_config(source: Option<&str>) -> Result<AuditConfig> {
    match source {
        Some(source) => AuditConfig::load(source).await,
        None => {
            warn!("No configuration given, expected attribute table is empty");
            Ok(AuditConfig::default())
        }
    }
}

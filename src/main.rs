//! cukemerge - merge sharded Cucumber reports
//!
//! Runs once at the end of a parallel mobile UI test run. Merges the
//! per-shard Cucumber JSON reports into the first shard file, deletes the
//! other shards, and writes a summary report plus a Slack payload.
//!
//! Exit codes:
//!   0 - Reports merged, or no shard reports found
//!   1 - Runtime error (unreadable or malformed shard, write failure, config)

mod analysis;
mod cli;
mod config;
mod errors;
mod metadata;
mod models;
mod notify;
mod report;
mod scanner;

use analysis::ReportAggregator;
use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use metadata::{
    EnvironmentMetadata, MetadataSource, OverrideMetadata, PropertiesMetadata, StaticMetadata,
};
use models::BuildOutcome;
use notify::webhook::WebhookClient;
use notify::FileSink;
use scanner::{ScanConfig, ShardScanner};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("cukemerge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_merge(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cukemerge.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  .cukemerge.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .cukemerge.toml")?;

    println!("✅ Created .cukemerge.toml with default settings.");
    println!("   Edit it to customize report locations, metadata and the webhook.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the merge workflow. Returns the exit code.
async fn run_merge(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let scanner = ShardScanner::new(
        config.reports.dir.clone(),
        ScanConfig::from(&config.reports),
    );
    let aggregator = ReportAggregator::new(scanner, config.output.summary.clone());

    if args.dry_run {
        return handle_dry_run(&aggregator);
    }

    println!(
        "🔀 Merging shard reports in {}",
        config.reports.dir.display()
    );

    let metadata = metadata_source(&config);
    let sink = FileSink::new(config.output.notification.clone());
    let outcome = args.outcome.map(BuildOutcome::from);

    let Some(result) = aggregator.run(outcome, metadata.as_ref(), &sink)? else {
        println!("   No shard reports found. Nothing to do.");
        return Ok(0);
    };

    println!("\n📊 Run Summary:");
    for line in report::generate_summary_text(&result.summary).lines() {
        println!("   {}", line);
    }
    println!("   Build: {}", result.outcome);

    println!(
        "\n✅ Merged {} features into {} ({} shard files removed)",
        result.feature_count,
        result.primary.display(),
        result.deleted.len()
    );
    println!("   Summary: {}", config.output.summary.display());
    println!("   Slack payload: {}", sink.path().display());

    if let Some(ref url) = config.notification.webhook_url {
        println!("\n📣 Posting notification to Slack...");
        let client = WebhookClient::new(url.clone(), config.notification.timeout_seconds)?;
        if let Err(e) = client.publish(&result.payload).await {
            warn!("Failed to post notification: {:#}", e);
            eprintln!("⚠️  Slack notification was not delivered: {:#}", e);
        }
    }

    Ok(0)
}

/// Pick the metadata source: fixed values when both are configured,
/// otherwise the properties file with any single override applied.
fn metadata_source(config: &Config) -> Box<dyn MetadataSource> {
    match (&config.metadata.app, &config.metadata.platform) {
        (Some(app), Some(platform)) => Box::new(StaticMetadata(EnvironmentMetadata {
            app: app.clone(),
            platform: platform.clone(),
        })),
        (app, platform) => Box::new(OverrideMetadata::new(
            PropertiesMetadata::new(config.metadata.properties.clone()),
            app.clone(),
            platform.clone(),
        )),
    }
}

/// Handle --dry-run: merge in memory and print statistics.
fn handle_dry_run(aggregator: &ReportAggregator) -> Result<i32> {
    println!("\n🔍 Dry run: merging in memory (nothing is written or deleted)...\n");

    let Some(preview) = aggregator.preview()? else {
        println!("   No shard reports found.");
        return Ok(0);
    };

    println!("   Found {} shard reports:\n", preview.files.len());
    for (i, file) in preview.files.iter().enumerate() {
        let role = if i == 0 { " (primary)" } else { "" };
        println!("     📄 {}{}", file.display(), role);
    }

    println!("\n   Merged features: {}", preview.features.len());
    for line in report::generate_summary_text(&preview.summary).lines() {
        println!("   {}", line);
    }
    println!(
        "   Inferred build outcome: {}",
        preview.summary.inferred_outcome()
    );

    println!("\n✅ Dry run complete. No files were changed.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

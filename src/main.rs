use anyhow::{Context, Result};
use clap::{Arg, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use langtag_fixer::{
    Config, ConsoleReporter, ContainerCorrector, FfmpegSampleExtractor, MediaCatalog, PlexCatalog,
    RemediationPipeline, RunSession, WhisperLanguageDetector,
};

#[tokio::main]
async fn main() {
    let matches = Command::new("langtag-fixer")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Detects and writes missing audio language tags for a Plex TV library")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (key=value lines, or .toml)")
                .default_value("config.txt")
        )
        .arg(
            Arg::new("log-file")
                .short('l')
                .long("log-file")
                .value_name("FILE")
                .help("Audit log the run outcomes are appended to")
                .default_value("identifier.txt")
        )
        .arg(
            Arg::new("library")
                .long("library")
                .value_name("NAME")
                .help("Override the library section from the configuration")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    // Configure logging based on verbose flag
    if matches.get_flag("verbose") {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_thread_ids(true)
            .with_env_filter("debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("langtag_fixer=info,warn")
            .init();
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.txt"));
    let log_path = matches
        .get_one::<String>("log-file")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("identifier.txt"));
    let library = matches.get_one::<String>("library").cloned();

    let mut session = match RunSession::start(&log_path) {
        Ok(session) => session,
        Err(e) => {
            error!("❌ Cannot open audit log {}: {}", log_path.display(), e);
            std::process::exit(1);
        }
    };

    let result = run(&config_path, library, &mut session).await;
    if let Err(e) = &result {
        error!("❌ Run aborted: {:?}", e);
    }

    match session.finish() {
        Ok(summary) => info!(
            "🎉 Run finished in {:.2}s: {} updated, {} skipped, {} failed",
            summary.elapsed.as_secs_f64(),
            summary.processed,
            summary.skipped,
            summary.failed
        ),
        Err(e) => error!("Failed to close audit log: {}", e),
    }

    if result.is_err() {
        std::process::exit(1);
    }
}

async fn run(config_path: &Path, library: Option<String>, session: &mut RunSession) -> Result<()> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    if let Some(library) = library {
        config.catalog.library = library;
    }

    info!("🚀 Language Tag Fixer starting...");
    info!("{}", config.summary());

    let catalog = PlexCatalog::connect(
        &config.catalog.base_url,
        &config.catalog.token,
        config.catalog.timeout(),
    )
    .await
    .context("connecting to the media catalog")?;

    let section = catalog
        .section(&config.catalog.library)
        .await
        .context("looking up the library section")?;

    let detector = WhisperLanguageDetector::new(&config.detection.endpoint, config.detection.timeout())
        .context("building the detection client")?;

    let pipeline = RemediationPipeline::new(
        Arc::new(catalog),
        Arc::new(FfmpegSampleExtractor::new(&config.sampling, &config.tools)),
        Arc::new(detector),
        Arc::new(ContainerCorrector::new(&config.tools)),
    )
    .with_observer(Arc::new(ConsoleReporter));

    pipeline
        .run(&section, &config.catalog.excluded_languages, session)
        .await?;
    Ok(())
}

//! Warden - prompt moderation and normalization service.
//!
//! This is the main binary. It loads configuration from the environment,
//! builds the remote clients and the pipeline, and serves the HTTP API
//! until Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden_core::{AzureContentSafety, AzureOpenAi, Pipeline, Rewriter, SafetyClassifier, WardenConfig};
use warden_server::{AppState, Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Warden - moderates and normalizes prompts before they reach a model
#[derive(Parser, Debug)]
#[command(name = "warden", version, about)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write daily-rotated log files to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn env_filter(args: &Args) -> EnvFilter {
    let log_level = if args.debug { "debug" } else { &args.log_level };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warden={},warn", log_level)))
}

fn file_appender(log_dir: &Path) -> Option<RollingFileAppender> {
    std::fs::create_dir_all(log_dir).ok()?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix("warden")
        .filename_suffix("log")
        .build(log_dir)
        .ok()
}

/// Initialize logging, with file rotation when a log directory is given.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = env_filter(args);

    if let Some(log_dir) = &args.log_dir {
        if let Some(appender) = file_appender(log_dir) {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stdout))
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            tracing::info!("Logging to {:?}", log_dir);
            return Some(guard);
        }

        tracing_subscriber::fmt().with_env_filter(filter).init();
        tracing::warn!("File logging unavailable, using console only");
        return None;
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
    None
}

fn build_pipeline(config: &WardenConfig) -> anyhow::Result<Pipeline> {
    let pipeline_config = &config.pipeline;
    let attempt_timeout = pipeline_config.retry.attempt_timeout;

    let safety_service = AzureContentSafety::new(config.content_safety.clone(), attempt_timeout)
        .context("failed to build content safety client")?;
    let rewrite_service = AzureOpenAi::new(config.openai.clone(), attempt_timeout)
        .context("failed to build rewrite client")?;

    Ok(Pipeline::new(
        pipeline_config,
        SafetyClassifier::new(Arc::new(safety_service), pipeline_config.retry.clone()),
        Rewriter::new(Arc::new(rewrite_service), pipeline_config.retry.clone()),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    tracing::info!("Starting Warden...");
    tracing::debug!("Args: {:?}", args);

    let config = WardenConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        deployment = %config.openai.deployment,
        failure_policy = ?config.pipeline.safety_failure_policy,
        max_severity = config.pipeline.max_severity,
        "Configuration loaded"
    );

    let pipeline = build_pipeline(&config)?;
    let state = AppState::new(pipeline, config.pipeline.request_timeout);

    let server_config = ServerConfig::default()
        .with_host(args.host)
        .with_port(args.port);
    let server = Server::with_state(server_config, state)?;
    server.run().await?;

    tracing::info!("Warden shutting down");
    Ok(())
}

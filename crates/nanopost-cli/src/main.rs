//! nanopost - scheduled forum agent
//!
//! Usage:
//!   nanopost once               Run exactly one heartbeat
//!   nanopost run [MINUTES]      Run a heartbeat now and then every MINUTES
//!   nanopost init [DIR]         Write default config.toml and prompts.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nanopost_bot::{Heartbeat, Scheduler};
use nanopost_client::{load_env_file, Credentials, ForumClient, GenerationClient};
use nanopost_core::config::{find_config_dir, CONFIG_FILE, MAX_INTERVAL_MINUTES};
use nanopost_core::{BotConfig, Prompts, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "nanopost")]
#[command(author, version, about = "Scheduled forum agent: replies, votes, engages and posts")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding config.toml and prompts.toml
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one heartbeat and exit
    Once,

    /// Run a heartbeat immediately, then on a fixed interval until interrupted
    Run {
        /// Minutes between heartbeats (defaults to bot.default_interval_minutes)
        interval: Option<u64>,
    },

    /// Write default configuration files
    Init {
        /// Project directory; files go into DIR/config
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => {
            init_logging(cli.verbose, None)?;
            cmd_init(&path)
        }
        Commands::Once => cmd_agent(cli.config_dir, cli.verbose, None).await,
        Commands::Run { interval } => {
            cmd_agent(cli.config_dir, cli.verbose, Some(interval)).await
        }
    }
}

/// Console logging, plus the run log file when `log_path` is given
///
/// `RUST_LOG` overrides the level chosen by `--verbose`. The returned guard
/// flushes the file writer and must live as long as the process.
fn init_logging(verbose: bool, log_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = fmt::layer().with_target(false);

    let Some(path) = log_path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()?;
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;
    Ok(Some(guard))
}

fn cmd_init(path: &Path) -> Result<()> {
    let config_dir = path.join("config");
    let written = BotConfig::write_default(&config_dir)
        .with_context(|| format!("Failed to write defaults into {}", config_dir.display()))?;

    if written.is_empty() {
        println!(
            "Configuration already present in {}, nothing written",
            config_dir.display()
        );
        return Ok(());
    }

    println!("Initialized nanopost in {}", config_dir.display());
    println!("Created:");
    for file in &written {
        println!("  {}", file.display());
    }
    println!("\nNext steps:");
    println!("  1. Put your API keys in .env (see [api] in config.toml for the names)");
    println!("  2. Run 'nanopost once' to try a single heartbeat");
    Ok(())
}

/// `interval` is `None` for run-once mode, `Some(minutes)` for the loop
async fn cmd_agent(
    config_dir: Option<PathBuf>,
    verbose: bool,
    interval: Option<Option<u64>>,
) -> Result<()> {
    let config_dir = config_dir.unwrap_or_else(find_config_dir);

    // Logging needs the configured log path, so config load errors are
    // reported once the subscriber exists.
    let (config, config_error) = match BotConfig::load(&config_dir.join(CONFIG_FILE)) {
        Ok(config) => (config, None),
        Err(e) => (BotConfig::default(), Some(e)),
    };
    let _guard = init_logging(verbose, Some(&config.output.log_path()))?;
    if let Some(e) = config_error {
        warn!("Using default configuration: {}", e);
    }

    if let Some(path) = load_env_file() {
        info!("Loaded environment from {}", path.display());
    }
    let credentials =
        Credentials::from_env(&config.api.forum_key_env, &config.api.generation_key_env)
            .context("Missing API credentials")?;
    let prompts = Prompts::load_or_default(&config_dir);

    let forum = ForumClient::new(
        &config.api.base_url,
        &credentials.forum_token,
        config.request_timeout(),
    )?;
    let generator = GenerationClient::new(
        &config.api.generation_url,
        &config.api.generation_model,
        &credentials.generation_token,
        config.request_timeout(),
    )?;

    let minutes = interval.map(|m| resolve_interval(m, &config));
    print_banner(&config, &config_dir, minutes);

    let config = Arc::new(config);
    let heartbeat = Heartbeat::load(config, prompts, forum, generator, SystemClock).await;
    let mut scheduler = Scheduler::new(
        heartbeat,
        Duration::from_secs(minutes.unwrap_or(1).saturating_mul(60)),
    );

    match minutes {
        None => {
            let stats = scheduler.run_once().await;
            if stats.is_quiet() {
                info!("Nothing to do this time");
            }
        }
        Some(_) => {
            // listen from startup so a signal during the first heartbeat
            // is seen at the next idle point
            let (tx, rx) = tokio::sync::oneshot::channel::<()>();
            tokio::spawn(async move {
                shutdown_signal().await;
                let _ = tx.send(());
            });
            scheduler
                .run_until(async {
                    let _ = rx.await;
                })
                .await;
        }
    }

    info!(
        "Done: {} heartbeats, {} tweets archived",
        scheduler.heartbeat().cycles(),
        scheduler.heartbeat().tweet_count()
    );
    Ok(())
}

/// Minutes between heartbeats; never zero
fn resolve_interval(requested: Option<u64>, config: &BotConfig) -> u64 {
    requested
        .unwrap_or(config.bot.default_interval_minutes)
        .clamp(1, MAX_INTERVAL_MINUTES)
}

fn print_banner(config: &BotConfig, config_dir: &Path, minutes: Option<u64>) {
    println!("nanopost {}", env!("CARGO_PKG_VERSION"));
    println!("==============");
    println!("Agent:    {}", config.agent.name);
    println!("Config:   {}", config_dir.display());
    println!("Model:    {}", config.api.generation_model);
    match minutes {
        Some(m) => println!("Interval: every {} minutes", m),
        None => println!("Mode:     single heartbeat"),
    }
    println!(
        "Posting:  {}",
        if config.posting.enabled { "enabled" } else { "disabled" }
    );
    println!();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

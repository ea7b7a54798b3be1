use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use insightlog::{Logger, LoggerConfig, Severity};

/// Write diagnostics logs and package them into shareable archives
#[derive(Debug, Parser)]
#[command(name = "insightlog", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Application name (overrides the config file)
    #[arg(long, global = true)]
    app_name: Option<String>,

    /// Log directory (overrides the config file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Append a line to the active log
    Log {
        /// trace, info, notice, warn, error or critical
        severity: Severity,
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print the log directory
    Path,
    /// Build the diagnostics archive and print its path
    Archive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "insightlog=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LoggerConfig::load(path)?,
        None => LoggerConfig::default(),
    };
    if let Some(app_name) = cli.app_name {
        config.app_name = app_name;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }

    let logger = Arc::new(Logger::new(config).context("Failed to start logger")?);

    match cli.command {
        Command::Log { severity, text } => logger.emit(severity, text.join(" ")),
        Command::Path => println!("{}", logger.log_directory().display()),
        Command::Archive => match Arc::clone(&logger).build_archive_async().await {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Failed to build diagnostics archive"),
        },
    }

    Ok(())
}

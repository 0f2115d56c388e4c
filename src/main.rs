//! Sysdash - live host metrics dashboard for the terminal
//!
//! Samples disk, CPU, memory and sensor readings concurrently once per
//! interval and repaints them as bordered tables, with an on-demand NVMe
//! SSD health report.

mod config;
mod core;
mod integrations;
mod metrics;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::core::app::App;
use crate::core::sampler::Sampler;
use crate::integrations::ssd::SsdHealthView;
use crate::ui::table::TableBlock;
use crate::ui::terminal::TerminalScreen;

#[derive(Parser)]
#[command(name = "sysdash")]
#[command(version)]
#[command(about = "Live host metrics dashboard for the terminal", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "SYSDASH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample every source once and print the tables
    Snapshot,

    /// Print the NVMe health report for the root filesystem's disk
    Ssd,

    /// Write the default configuration file
    InitConfig {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn setup_logging(verbosity: u8) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // The dashboard owns stdout, so logs only go to file
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sysdash")
        .join("logs");

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "sysdash.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let path = explicit.or_else(|| Config::default_path().filter(|p| p.exists()));
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            Config::load(&path)
        }
        None => Ok(Config::default()),
    }
}

async fn print_snapshot(config: &Config) -> Result<()> {
    let sampler = Sampler::new(metrics::default_sources(config), &config.sampling);
    for result in sampler.sample_all().await {
        for line in TableBlock::from_result(&result).lines {
            println!("{}", line);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _logging_guard = setup_logging(cli.verbose)?;

    if let Some(Commands::InitConfig { force }) = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => Config::default_path().context("no configuration directory on this platform")?,
        };
        return config::init_config(&path, force);
    }

    let config = load_config(cli.config)?;

    match cli.command {
        Some(Commands::Snapshot) => print_snapshot(&config).await?,
        Some(Commands::Ssd) => SsdHealthView::new(config.ssd.clone()).print_report().await?,
        Some(Commands::InitConfig { .. }) => {}
        None => {
            let screen = TerminalScreen::new().context("terminal is not available")?;
            let sampler = Sampler::new(metrics::default_sources(&config), &config.sampling);
            let sub_view = SsdHealthView::new(config.ssd.clone());

            let mut app = App::new(screen, sampler, sub_view);
            app.run().await?;
        }
    }

    Ok(())
}

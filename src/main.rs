//! wolpve CLI entry point.
//!
//! Provides `start` to run the Wake-on-LAN server and `check` to validate a
//! configuration file and print the BPF filter for each interface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use wolpve::capture::filter::build_filter;
use wolpve::capture::live::PcapBackend;
use wolpve::config::{load_config, resolve_config_path, Config};
use wolpve::executor::host::HostRunner;
use wolpve::logging::{self, Logger};
use wolpve::server::Server;

/// wolpve — power on Proxmox VMs and containers from Wake-on-LAN packets.
#[derive(Parser)]
#[command(name = "wolpve", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Start the Wake-on-LAN server.
    Start,
    /// Validate the configuration and print each interface's filter.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_console();

    let path = resolve_config_path(cli.config, |key| std::env::var(key).ok());
    let config =
        load_config(&path).with_context(|| format!("failed to load {}", path.display()))?;

    match cli.command {
        Command::Start => handle_start(config).await,
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Run the server until every capture session has exited.
async fn handle_start(config: Config) -> anyhow::Result<()> {
    let logger = Logger::from_config(&config.syslog).context("failed to set up logging")?;
    logger.info(format!(
        "WOL-PVE Server ({}) starting...",
        env!("CARGO_PKG_VERSION")
    ));

    let server = Server::new(
        &config,
        Arc::new(PcapBackend::new()),
        Arc::new(HostRunner::new()),
        logger,
    )?;

    let exits = server.run().await;
    info!(sessions = exits.len(), "all capture sessions exited");
    Ok(())
}

/// Print the resolved configuration summary.
fn handle_check(config: &Config) {
    println!("configuration OK");
    for spec in &config.listen {
        println!("{}: {}", spec.interface, build_filter(spec));
    }
    for dir in &config.descriptor_dirs {
        println!("descriptor dir: {}", dir.display());
    }
}

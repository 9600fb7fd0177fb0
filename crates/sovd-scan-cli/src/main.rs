//! sovd-scan - Command-line driver for the diagnostic service enumerator
//!
//! Runs an enumerator against a CAN/ISO-TP or scripted mock transport, prints
//! the resulting report and stores snapshots for later inspection.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sovd_scan::UdsCatalog;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "sovd-scan")]
#[command(author, version, about = "Diagnostic service enumeration")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SOVD_SCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate requests in the default session
    Scan(ScanArgs),

    /// Print the report of a saved snapshot
    Report {
        /// Snapshot file written by `scan --save`
        file: PathBuf,

        /// Catalog the snapshot was taken with (detected from the snapshot if omitted)
        #[arg(long, value_enum)]
        catalog: Option<CatalogArg>,

        /// Show all results instead of the filtered view
        #[arg(long)]
        all: bool,
    },
}

/// Arguments of the scan command
#[derive(Args)]
pub struct ScanArgs {
    /// What to enumerate
    #[arg(long, value_enum, default_value = "services")]
    pub catalog: CatalogArg,

    /// Identifier range, e.g. 0xF180:0xF19F
    #[arg(long)]
    pub range: Option<String>,

    /// Scripted mock transport (TOML with [[responses]])
    #[arg(long, conflicts_with = "interface")]
    pub mock: Option<PathBuf>,

    /// CAN interface for SocketCAN/ISO-TP
    #[arg(long, requires_all = ["tx_id", "rx_id"])]
    pub interface: Option<String>,

    /// Transmit CAN ID (tester -> ECU)
    #[arg(long)]
    pub tx_id: Option<String>,

    /// Receive CAN ID (ECU -> tester)
    #[arg(long)]
    pub rx_id: Option<String>,

    /// Response timeout per request in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Time budget per pass in seconds
    #[arg(long)]
    pub execution_time: Option<f64>,

    /// Stop a pass when a request is not answered
    #[arg(long)]
    pub exit_if_no_answer: bool,

    /// Stop once the ECU reports a service as not supported
    #[arg(long)]
    pub exit_if_not_supported: bool,

    /// Do not repeat requests answered with busyRepeatRequest
    #[arg(long)]
    pub no_busy_retry: bool,

    /// Terminate the scan on the first negative response
    #[arg(long)]
    pub exit_on_negative: bool,

    /// Maximum number of execute passes
    #[arg(long, default_value = "10")]
    pub passes: u32,

    /// Show all results instead of the filtered view
    #[arg(long)]
    pub all: bool,

    /// Save a snapshot to this file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

/// Request catalog selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogArg {
    /// One-byte requests for every service id
    Services,
    /// DiagnosticSessionControl sub-functions
    Sessions,
    /// ReadDataByIdentifier over a DID range
    ReadData,
    /// ECUReset sub-functions
    Reset,
}

impl From<CatalogArg> for UdsCatalog {
    fn from(arg: CatalogArg) -> Self {
        match arg {
            CatalogArg::Services => UdsCatalog::ServiceScan,
            CatalogArg::Sessions => UdsCatalog::SessionScan,
            CatalogArg::ReadData => UdsCatalog::ReadDataById,
            CatalogArg::Reset => UdsCatalog::EcuReset,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(cli.output.map(|o| o.as_str()), cli.no_color);
    let format = OutputFormat::from_name(&merged.output).unwrap_or_default();

    // Create output context
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);

    // Execute command
    match &cli.command {
        Commands::Scan(args) => {
            commands::scan(args, &config, &ctx).await?;
        }

        Commands::Report { file, catalog, all } => {
            commands::report(file, *catalog, *all, &ctx)?;
        }
    }

    Ok(())
}

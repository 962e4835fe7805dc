//! Precache CLI - Run the offline asset cache lifecycle from the command line.
//!
//! Commands:
//! - `precache manifest` - Show the configured version and asset manifest
//! - `precache install` - Precache the manifest under the version's cache
//! - `precache activate` - Remove every cache but the current version's
//! - `precache deploy` - Install, then activate
//! - `precache fetch` - Answer a request cache-first
//! - `precache caches` - List stored caches

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CachesArgs, FetchArgs};

/// Precache CLI - Versioned offline asset cache
#[derive(Parser)]
#[command(name = "precache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the asset set version identifier
    #[arg(long = "asset-version", global = true, value_name = "ID")]
    asset_version: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the version, cache name and asset manifest
    Manifest,

    /// Precache every manifest asset for the configured version
    Install,

    /// Delete caches left behind by other versions
    Activate,

    /// Install the configured version and activate it
    Deploy,

    /// Answer a request cache-first, falling back to the network
    Fetch(FetchArgs),

    /// List stored caches
    Caches(CachesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let ctx = context::Context::load(cli.config.as_deref(), cli.asset_version, output)?;

    // Execute command
    let result = match cli.command {
        Commands::Manifest => commands::manifest::run(&ctx).await,
        Commands::Install => commands::install::run(&ctx).await,
        Commands::Activate => commands::activate::run(&ctx).await,
        Commands::Deploy => commands::deploy::run(&ctx).await,
        Commands::Fetch(args) => commands::fetch::run(args, &ctx).await,
        Commands::Caches(args) => commands::caches::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,precache_worker=debug,precache_store=debug,precache_net=debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

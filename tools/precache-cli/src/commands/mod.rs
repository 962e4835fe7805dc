//! CLI command implementations.

pub mod activate;
pub mod caches;
pub mod deploy;
pub mod fetch;
pub mod install;
pub mod manifest;

use clap::Args;

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// URL to request. Relative URLs resolve against the configured origin.
    pub url: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Extra request header as `name:value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Write the response body to a file.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print response headers.
    #[arg(short, long)]
    pub include: bool,
}

/// Arguments for the caches command.
#[derive(Args)]
pub struct CachesArgs {
    /// Show only caches left behind by other versions.
    #[arg(long)]
    pub stale: bool,
}

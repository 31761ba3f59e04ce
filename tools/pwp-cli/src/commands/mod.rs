//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod fetch;
pub mod install;
pub mod queue;
pub mod sync;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use http::Method;
use url::Url;

use crate::context::Context;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Reinstall even if the cache is already seeded.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Locator to request. Relative paths resolve against the origin.
    pub url: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request body.
    #[arg(short, long)]
    pub data: Option<String>,

    /// Referring page.
    #[arg(short, long)]
    pub referrer: Option<String>,

    /// Extra header, as `name: value`. May be repeated.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Print response headers.
    #[arg(short, long)]
    pub include: bool,
}

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Locators to classify. Relative paths resolve against the origin.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,
}

/// Arguments for the sync command.
#[derive(Args)]
pub struct SyncArgs {
    /// Sync tag to signal (default: the configured tag).
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Keep signalling with backoff until the queue is empty.
    #[arg(short, long)]
    pub watch: bool,
}

/// Arguments for the queue command.
#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued submissions.
    List,
    /// Drop every queued submission.
    Clear {
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,

        /// Base URL of the template host.
        #[arg(long, default_value = "http://localhost:8080/")]
        origin: String,
    },
    /// Validate the config file.
    Validate,
}

/// Resolve a command-line locator against the configured origin.
pub(crate) fn resolve_url(ctx: &Context, url: &str) -> Result<Url> {
    match Url::parse(url) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(ctx.config.worker.resolve(url)?),
        Err(e) => Err(anyhow!("Invalid URL {}: {}", url, e)),
    }
}

/// Parse a command-line method name.
pub(crate) fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow!("Invalid HTTP method: {}", method))
}

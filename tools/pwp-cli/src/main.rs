//! pwp - host the offline page worker from the command line.
//!
//! Commands:
//! - `pwp install` - Seed the cache with the precache list
//! - `pwp fetch` - Run one request through the worker
//! - `pwp classify` - Show how the worker would handle a request
//! - `pwp sync` - Replay deferred submissions
//! - `pwp queue` - Inspect or clear deferred submissions
//! - `pwp config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ClassifyArgs, ConfigArgs, FetchArgs, InstallArgs, QueueArgs, SyncArgs};

/// pwp - Offline-capable page worker host
#[derive(Parser)]
#[command(name = "pwp")]
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

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the cache and activate the worker
    Install(InstallArgs),

    /// Run a request through the worker
    Fetch(FetchArgs),

    /// Show the class the worker assigns to a request
    Classify(ClassifyArgs),

    /// Replay deferred submissions
    Sync(SyncArgs),

    /// Inspect the submission queue
    Queue(QueueArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    if let Err(e) = ctx.init_logging() {
        ctx.output.warn(&format!("Logging disabled: {}", e));
    }

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(args, &ctx).await,
        Commands::Fetch(args) => commands::fetch::run(args, &ctx).await,
        Commands::Classify(args) => commands::classify::run(args, &ctx).await,
        Commands::Sync(args) => commands::sync::run(args, &ctx).await,
        Commands::Queue(args) => commands::queue::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

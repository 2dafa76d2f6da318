//! treemirror command-line interface
//!
//! Inspects and edits the mirrored node tree of one account: listing,
//! pinning, conflict markers, moves and removals. All mutations go through
//! the sync engine so the tree stays consistent.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use treemirror_core::config::Config;

mod commands;
mod context;
mod output;

use commands::conflicts::ConflictsCommand;
use commands::init::InitCommand;
use commands::mv::{CpCommand, MvCommand};
use commands::nodes::{InfoCommand, LsCommand};
use commands::pin::{OfflineCommand, PinCommand, UnpinCommand};
use commands::rm::RmCommand;
use context::CommandContext;
use output::{get_formatter, OutputFormat};

#[derive(Parser)]
#[command(name = "treemirror")]
#[command(about = "Inspect and edit the mirrored metadata tree")]
#[command(version)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account to operate on (defaults to account.default from the config)
    #[arg(long, global = true)]
    account: Option<String>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and the account root folder
    Init(InitCommand),
    /// List the children of a folder
    Ls(LsCommand),
    /// Show every stored attribute of a node
    Info(InfoCommand),
    /// Keep a file or folder available offline
    Pin(PinCommand),
    /// Stop keeping a file or folder available offline
    Unpin(UnpinCommand),
    /// List files that should be kept cached
    Offline(OfflineCommand),
    /// Move or rename a file or folder
    Mv(MvCommand),
    /// Copy the cached bytes of a file to another path
    Cp(CpCommand),
    /// Remove metadata and/or cached content
    Rm(RmCommand),
    /// Mark or clear conflicts
    #[command(subcommand)]
    Conflicts(ConflictsCommand),
}

/// Filter directive used when `RUST_LOG` is not set
fn default_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_filter(cli.verbose, cli.quiet, &config.logging.level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let formatter = get_formatter(format);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = match load_config(&config_path, cli.config.is_some()) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            std::process::exit(2);
        }
    };

    init_tracing(&cli, &config);

    let result = match CommandContext::open(&config, cli.account.as_deref()).await {
        Ok(ctx) => run(&cli.command, &ctx, format).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        formatter.error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(command: &Commands, ctx: &CommandContext, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Init(cmd) => cmd.execute(ctx, format).await,
        Commands::Ls(cmd) => cmd.execute(ctx, format).await,
        Commands::Info(cmd) => cmd.execute(ctx, format).await,
        Commands::Pin(cmd) => cmd.execute(ctx, format).await,
        Commands::Unpin(cmd) => cmd.execute(ctx, format).await,
        Commands::Offline(cmd) => cmd.execute(ctx, format).await,
        Commands::Mv(cmd) => cmd.execute(ctx, format).await,
        Commands::Cp(cmd) => cmd.execute(ctx, format).await,
        Commands::Rm(cmd) => cmd.execute(ctx, format).await,
        Commands::Conflicts(cmd) => cmd.execute(ctx, format).await,
    }
}

/// Loads and validates the configuration
///
/// A missing file at the default location means defaults; a path given
/// explicitly must exist.
fn load_config(path: &std::path::Path, explicit: bool) -> anyhow::Result<Config> {
    let config = if explicit || path.exists() {
        Config::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {e:#}", path.display()))?
    } else {
        Config::default()
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let list: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration: {}", list.join("; "));
    }
    Ok(config)
}

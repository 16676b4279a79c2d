//! sessiondigest CLI: the main entry point.
//!
//! Commands:
//! - `run`: Process a session file, a session folder, or a directory of them
//! - `config`: Show, locate, or validate the configuration
//! - `doctor`: Diagnose configuration and provider health
//!
//! Exit status of `run`: 0 when no item failed, 2 when at least one item
//! failed, 1 when the run could not start or aborted.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sessiondigest",
    about = "sessiondigest — batch post-processing for recorded LLM sessions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process sessions and write analysis results
    Run(commands::run::RunArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,

        /// Config file to use instead of ~/.sessiondigest/config.toml
        #[arg(long, global = true)]
        config: Option<std::path::PathBuf>,
    },

    /// Diagnose configuration and provider health
    Doctor {
        /// Config file to use instead of ~/.sessiondigest/config.toml
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum ConfigAction {
    /// Print the resolved configuration (keys redacted)
    Show,
    /// Print the default config file path
    Path,
    /// Validate the configuration
    Validate,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Run(args) => {
            let report = commands::run::run(args).await?;
            if !report.is_success() {
                std::process::exit(2);
            }
        }
        Commands::Config { action, config } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show(config.as_deref()).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate(config.as_deref()).await?,
        },
        Commands::Doctor { config } => commands::doctor::run(config.as_deref()).await?,
    }

    Ok(())
}

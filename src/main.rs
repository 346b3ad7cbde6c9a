use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use windfall::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "windfall",
    version,
    about = "Time-boxed giveaway bot: request parsing, scheduled selection and code delivery",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "windfall.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: poll the inbox and execute scheduled giveaway jobs
    Run,

    /// Dry-run a request body through the request and code parsers
    Check {
        /// Request body, as it would appear in a private message
        body: String,
    },

    /// List pending giveaway jobs from the persistent store
    Jobs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else {
        let mut config = Config::default();
        config.apply_env();
        config
    };

    match cli.command {
        Commands::Run => {
            tracing::info!("windfall starting");
            commands::run(config).await?;
            tracing::info!("windfall stopped");
        }
        Commands::Check { body } => {
            commands::check(&config, &body)?;
        }
        Commands::Jobs => {
            commands::jobs(&config)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("windfall=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("windfall=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "tabkeeper")]
#[command(about = "Tabkeeper - tab lifecycle and resource-policy engine", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Read the configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against the simulated host and print its events
    Run {
        /// Stop after this many seconds
        #[arg(long, default_value_t = 30)]
        seconds: u64,

        /// Print events and stats as JSON lines
        #[arg(long)]
        json: bool,

        /// Keep state in memory instead of the data directory
        #[arg(long)]
        ephemeral: bool,
    },
    /// Dump one persisted partition as JSON
    List {
        /// islands, containers, boosts, sessions, snoozed or settings
        partition: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            seconds,
            json,
            ephemeral,
        } => commands::run::run(config, seconds, json, ephemeral).await?,
        Commands::List { partition } => commands::list::list(&config, &partition).await?,
        Commands::Config => commands::config::show(&config, cli.config.as_deref())?,
    }

    Ok(())
}

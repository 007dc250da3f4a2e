//! taskloom CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Write a default config file
//! - `agent`    — Interactive chat or single-prompt mode
//! - `actions`  — List the actions the agent can take

use clap::{Parser, Subcommand};

mod commands;
mod speech;

#[derive(Parser)]
#[command(
    name = "taskloom",
    about = "taskloom — an agent that decides, plans and acts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Chat with the agent
    Agent(commands::agent::AgentArgs),

    /// List the registered actions
    Actions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Agent(args) => commands::agent::run(args).await?,
        Commands::Actions => commands::actions::run().await?,
    }

    Ok(())
}

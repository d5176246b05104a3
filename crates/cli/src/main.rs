//! askfolio CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP chat endpoint
//! - `ask`: Answer one question from the terminal
//! - `inspect`: Show chunks and retrieval results without calling the LLM
//! - `doctor`: Diagnose configuration and knowledge base

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "askfolio",
    about = "askfolio: grounded Q&A over a portfolio profile",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ./askfolio.toml)
    #[arg(short, long, global = true, env = "ASKFOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question
    Ask {
        /// The question to answer
        #[arg(short, long)]
        message: String,
    },

    /// Show the chunks derived from the knowledge base
    Inspect {
        /// Score chunks against this query and show the assembled context
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Diagnose configuration and knowledge base
    Doctor {
        /// Also check that the provider is reachable
        #[arg(long)]
        ping: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is the normal case outside local development.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(config_path, host, port).await?,
        Commands::Ask { message } => commands::ask::run(config_path, message).await?,
        Commands::Inspect { query } => commands::inspect::run(config_path, query)?,
        Commands::Doctor { ping } => commands::doctor::run(config_path, ping).await?,
    }

    Ok(())
}

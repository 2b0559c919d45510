mod commands;

use clap::{Parser, Subcommand};
use commands::{build, serve};
use std::error::Error;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ncdc")]
#[command(author, version, about = "Live-reloading mock server for consumer-driven contracts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    async fn run(self) -> Result<(), Box<dyn Error>> {
        match self.command {
            Commands::Build(args) => build::run(args).await,
            Commands::Serve(args) => serve::run(args).await,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a config file and its fixtures into a standalone JSON file
    Build(commands::build::BuildArgs),

    /// Serve mock responses, optionally restarting on file changes
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() {
    // Filter from the environment, e.g. NCDC_LOG=debug
    let filter = EnvFilter::try_from_env("NCDC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

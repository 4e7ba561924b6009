use clap::Parser;

use freshwatch::Settings;
use freshwatch::cli::commands::{estimate, init, watch};
use freshwatch::cli::{Cli, Commands};
use freshwatch::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration.");
        Settings::default()
    });

    logging::init_with_config(&config.logging);

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    match &cli.command {
        Commands::Init { force } => init::run_init(*force),
        Commands::Config => init::run_config(&config),
        Commands::Estimate { path, json } => estimate::run(path.as_deref(), *json, &config),
        Commands::Watch { path } => watch::run(path.as_deref(), &config).await?,
    }

    Ok(())
}

//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Debounced filesystem watcher
#[derive(Parser, Debug)]
#[command(
    name = "freshwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Debounced filesystem watcher with a fingerprinted artifact cache",
    long_about = "Watch a project tree and report each changed file once it settles.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .freshwatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Estimate how many files a watch would cover
    #[command(about = "Run the size guard without watching")]
    Estimate {
        /// Directory to estimate (defaults to the detected project root)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch a directory until interrupted
    #[command(about = "Watch a directory and log settled changes")]
    Watch {
        /// Directory to watch (defaults to the detected project root)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Show configuration
    #[command(about = "Display active settings")]
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_estimate_json() {
        let cli = Cli::try_parse_from(["freshwatch", "estimate", "src", "--json"]).unwrap();
        match cli.command {
            Commands::Estimate { path, json } => {
                assert_eq!(path, Some(PathBuf::from("src")));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["freshwatch", "watch", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Watch { path: None }));
    }
}

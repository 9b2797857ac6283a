// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use leafscan::backends::camera::{CameraBackendType, Facing};
use leafscan::config::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "leafscan")]
#[command(about = "Capture a leaf photo for crop disease analysis")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/leafscan/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the capture screen in the terminal (default)
    Scan {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List available cameras
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Capture one still and hand it off without the interactive screen
    Snap {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the image currently handed off to analysis
    Handoff {
        /// Write the image bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Serve these image files as cameras instead of opening V4L2 devices
    #[arg(short, long, num_args = 1..)]
    source: Vec<PathBuf>,

    /// Preferred camera facing (front, rear, external)
    #[arg(short, long)]
    facing: Option<Facing>,
}

impl SourceArgs {
    fn apply(self, config: &mut Config) {
        if !self.source.is_empty() {
            config.backend = CameraBackendType::StillImages;
            config.source_paths = self.source;
        }
        if let Some(facing) = self.facing {
            config.preferred_facing = facing;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=leafscan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref());

    match cli.command {
        None => run_scan(&config),
        Some(Commands::Scan { source }) => {
            source.apply(&mut config);
            run_scan(&config)
        }
        Some(Commands::List { source }) => {
            source.apply(&mut config);
            cli::list_cameras(&config)
        }
        Some(Commands::Snap { source }) => {
            source.apply(&mut config);
            cli::take_snapshot(&config)
        }
        Some(Commands::Handoff { output }) => cli::show_handoff(&config, output),
    }
}

fn run_scan(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match leafscan::terminal::run(config)? {
        Some(route) => println!("Navigated to {}", route.path()),
        None => println!("Capture cancelled"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_reports_build_version() {
        let version = Cli::command().get_version().map(str::to_string);
        assert_eq!(version.as_deref(), Some(env!("GIT_VERSION")));
        assert!(!env!("GIT_VERSION").is_empty());
        assert!(!env!("GIT_VERSION").starts_with('v'));
    }
}

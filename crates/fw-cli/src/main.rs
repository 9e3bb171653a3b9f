//! CLI frontend for the Fabelweg interactive-fiction engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fw",
    about = "Fabelweg — a credit-gated interactive-fiction engine",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a story file: every choice target must resolve
    Check {
        /// Path to the story JSON file
        story: PathBuf,
    },

    /// Show a summary of a story's nodes and choices
    Show {
        /// Path to the story JSON file
        story: PathBuf,
    },

    /// Play a story interactively as a guest session
    Play {
        /// Path to the story JSON file
        story: PathBuf,

        /// Optional achievement catalog JSON file
        #[arg(short, long)]
        achievements: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { story } => commands::check::run(&story),
        Commands::Show { story } => commands::show::run(&story),
        Commands::Play {
            story,
            achievements,
        } => commands::play::run(&story, achievements.as_deref()),
    };

    if let Err(message) = result {
        eprintln!("{} {message}", "error:".red().bold());
        process::exit(1);
    }
}

//! CLI command definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Querydaemon - scatter/gather query aggregator
#[derive(Parser)]
#[command(
    name = "qd",
    about = "Broadcast a query to a responder fleet and pick the best answer",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run one query against a simulated responder fleet
    Ask {
        /// Query phrase to broadcast
        phrase: String,

        /// Number of simulated responders
        #[arg(short, long, default_value = "4")]
        responders: usize,

        /// Override the wait budget in milliseconds
        #[arg(short, long)]
        budget_ms: Option<u64>,

        /// Seed for a reproducible fleet
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_defaults() {
        let cli = Cli::parse_from(["qd", "ask", "capital of france"]);
        match cli.command {
            Some(Command::Ask {
                phrase,
                responders,
                budget_ms,
                seed,
            }) => {
                assert_eq!(phrase, "capital of france");
                assert_eq!(responders, 4);
                assert!(budget_ms.is_none());
                assert!(seed.is_none());
            }
            _ => panic!("expected ask command"),
        }
    }
}

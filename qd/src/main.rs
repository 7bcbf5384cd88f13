//! qd - scatter/gather query aggregator
//!
//! CLI entry point: broadcasts a query phrase to a simulated responder fleet
//! and prints the resolved outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use querydaemon::aggregator::{FixedBudget, Outcome, QueryAggregator};
use querydaemon::cli::{Cli, Command};
use querydaemon::config::Config;
use querydaemon::sim::{ConsolePresenter, LoopbackBus, ResponderProfile};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Ask {
            phrase,
            responders,
            budget_ms,
            seed,
        }) => cmd_ask(&config, &phrase, responders, budget_ms, seed).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Broadcast one phrase to a simulated fleet and print the outcome
async fn cmd_ask(
    config: &Config,
    phrase: &str,
    responders: usize,
    budget_ms: Option<u64>,
    seed: Option<u64>,
) -> Result<()> {
    let budget = budget_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.response.budget());

    let fleet = ResponderProfile::random_fleet(responders, seed);
    info!(responders = fleet.len(), "simulated fleet ready");

    let (bus, reply_rx) = LoopbackBus::new(fleet);
    let aggregator = QueryAggregator::new(
        Arc::new(bus),
        Arc::new(ConsolePresenter),
        Arc::new(FixedBudget(budget)),
    );
    let pump = LoopbackBus::pump(aggregator.collector(), reply_rx);

    println!(
        "{} {} {}",
        "asking".bold(),
        phrase.cyan(),
        format!("(budget {:?}, {} responders)", budget, responders).dimmed()
    );

    let started = Instant::now();
    let outcome = aggregator.ask_with_budget(phrase, budget).await?;
    let elapsed = started.elapsed();

    match &outcome {
        Outcome::Answered(winner) => {
            println!(
                "{} {} {} {}",
                "answered by".green(),
                winner.responder_id.bold(),
                format!("(confidence {:.2})", winner.confidence).dimmed(),
                format!("in {:.0?}", elapsed).dimmed()
            );
        }
        Outcome::Unanswered => {
            println!("{} {}", "no answer".red(), format!("after {:.0?}", elapsed).dimmed());
        }
    }

    let metrics = aggregator.metrics();
    println!();
    println!("{}", "aggregator metrics".bold());
    println!("  replies collected:  {}", metrics.replies_collected);
    println!("  extensions granted: {}", metrics.extensions_granted);
    println!("  late replies:       {}", metrics.late_replies);
    println!("  early completions:  {}", metrics.early_completions);

    pump.abort();
    Ok(())
}

//! Querydaemon - scatter/gather query aggregation
//!
//! A query phrase is broadcast to an unknown number of independent responder
//! agents; each may reply immediately, ask for more time, or stay silent.
//! The aggregator picks the single best reply under a bounded time budget
//! and commits to exactly one outcome per phrase, even if stragglers arrive
//! later.
//!
//! # Core Concepts
//!
//! - **One owner per phrase**: at most one query per phrase is in flight;
//!   overlapping asks fail fast instead of sharing state
//! - **Bounded wait, early exit**: a maximum-confidence answer or a drained
//!   extension list ends the wait before the budget does
//! - **Commit once**: resolution happens exactly once; late replies are
//!   logged and dropped, never stored
//!
//! # Modules
//!
//! - [`aggregator`] - registry, completion signal, collector, and coordinator
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`sim`] - loopback responder fleet for the demo CLI and tests

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod sim;

// Re-export commonly used types
pub use aggregator::{
    ACTION_EVENT, AggregateError, AggregatorMetrics, Broadcaster, BudgetPolicy, CompletionSignal, FixedBudget,
    MAX_CONFIDENCE, Outcome, Presenter, QueryAggregator, QueryReply, ResponseCollector, ResponseRegistry,
};
pub use config::{Config, ResponseConfig, SpeedMode};

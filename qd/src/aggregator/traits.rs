//! Collaborator interfaces the aggregator is wired with
//!
//! Transport and output are external concerns: the aggregator only ever
//! talks to them through these traits. Implementations decide what a
//! broadcast or a spoken answer actually means.

use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;

/// Publishes a query phrase to whatever responders are out there
///
/// Best-effort and fire-and-forget: the aggregator logs a failed broadcast
/// and still waits out the budget, it never retries. Responders reach back
/// through [`ResponseCollector::on_response`](super::ResponseCollector::on_response),
/// asynchronously, any number of times per phrase.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, phrase: &str) -> Result<()>;
}

/// Renders the winning answer and emits post-resolution events
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Speak or render the winning answer for a phrase
    async fn present(&self, phrase: &str, answer: &str) -> Result<()>;

    /// Emit a named event with a payload for downstream consumers
    async fn notify(&self, event: &str, payload: serde_json::Value) -> Result<()>;
}

/// Read-only source for the active wait budget
///
/// Consulted once at the start of each `ask`; the returned budget is fixed
/// for the lifetime of that query.
pub trait BudgetPolicy: Send + Sync {
    fn budget(&self) -> Duration;
}

/// Always the same budget, regardless of configuration
#[derive(Debug, Clone, Copy)]
pub struct FixedBudget(pub Duration);

impl BudgetPolicy for FixedBudget {
    fn budget(&self) -> Duration {
        self.0
    }
}

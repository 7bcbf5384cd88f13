//! Query coordination: broadcast, bounded wait, resolution
//!
//! One `ask` call owns one phrase end-to-end. Collection happens
//! concurrently through [`ResponseCollector`]; the coordinator only touches
//! shared state under the registry lock, and suspends in exactly one place,
//! the bounded wait on the phrase's completion signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::collector::ResponseCollector;
use super::messages::{
    ACTION_EVENT, AggregateError, AggregatorMetrics, Counters, Outcome, QueryReply, normalize_phrase,
};
use super::registry::ResponseRegistry;
use super::traits::{Broadcaster, BudgetPolicy, Presenter};

/// The aggregator: broadcasts queries and commits to exactly one outcome each
pub struct QueryAggregator {
    registry: Arc<Mutex<ResponseRegistry>>,
    broadcaster: Arc<dyn Broadcaster>,
    presenter: Arc<dyn Presenter>,
    policy: Arc<dyn BudgetPolicy>,
    counters: Arc<Counters>,
}

impl QueryAggregator {
    pub fn new(
        broadcaster: Arc<dyn Broadcaster>,
        presenter: Arc<dyn Presenter>,
        policy: Arc<dyn BudgetPolicy>,
    ) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ResponseRegistry::new())),
            broadcaster,
            presenter,
            policy,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Ingest handle for the transport to deliver responder messages
    pub fn collector(&self) -> ResponseCollector {
        ResponseCollector::new(self.registry.clone(), self.counters.clone())
    }

    /// Snapshot of aggregator counters
    pub fn metrics(&self) -> AggregatorMetrics {
        self.counters.snapshot()
    }

    /// Run one query with the budget from the active policy
    pub async fn ask(&self, phrase: &str) -> Result<Outcome, AggregateError> {
        let budget = self.policy.budget();
        self.ask_with_budget(phrase, budget).await
    }

    /// Run one query end-to-end with an explicit wait budget
    ///
    /// Broadcasts the phrase, waits until the budget elapses or the
    /// collector signals that waiting longer is pointless, then resolves the
    /// best collected reply. The budget is a hard ceiling: extension
    /// requests only prevent early completion, they never lengthen it.
    pub async fn ask_with_budget(&self, phrase: &str, budget: Duration) -> Result<Outcome, AggregateError> {
        let phrase = normalize_phrase(phrase);
        let signal = self.registry.lock().await.open(&phrase)?;
        Counters::bump(&self.counters.queries_started);

        info!(%phrase, budget_ms = budget.as_millis() as u64, "broadcasting query");
        if let Err(e) = self.broadcaster.broadcast(&phrase).await {
            // Fire-and-forget: a dead transport just means nobody answers
            warn!(%phrase, error = %e, "broadcast failed, waiting out the budget anyway");
        }

        if signal.wait(budget).await {
            debug!(%phrase, "woken early by completion signal");
            Counters::bump(&self.counters.early_completions);
        } else {
            debug!(%phrase, "budget elapsed, checking responses");
        }

        Ok(self.resolve(&phrase).await)
    }

    /// Pick the winner from everything collected and tear down the phrase
    async fn resolve(&self, phrase: &str) -> Outcome {
        // Removing the entry under the lock both discards outstanding
        // extension requests and makes any further reply for this phrase
        // late by definition. Idempotent close keeps a racing duplicate
        // resolution harmless.
        let state = self.registry.lock().await.close(phrase);

        let Some(state) = state else {
            debug!(%phrase, "phrase already resolved");
            return Outcome::Unanswered;
        };

        let mut best: Option<QueryReply> = None;
        let mut ties: Vec<String> = Vec::new();
        for reply in state.replies {
            let best_confidence = best.as_ref().map(|b| b.confidence);
            match best_confidence {
                None => best = Some(reply),
                Some(current) if reply.confidence > current => {
                    best = Some(reply);
                    ties.clear();
                }
                Some(current) if reply.confidence == current => {
                    ties.push(reply.responder_id.clone());
                }
                Some(_) => {}
            }
        }

        let Some(winner) = best else {
            info!(%phrase, "no usable reply collected");
            Counters::bump(&self.counters.unanswered);
            return Outcome::Unanswered;
        };

        if !ties.is_empty() {
            // Tie-break is arrival order: first seen at equal confidence wins
            debug!(%phrase, winner = %winner.responder_id, ?ties, "discarded equal-confidence ties");
        }

        info!(
            %phrase,
            responder_id = %winner.responder_id,
            confidence = winner.confidence,
            "query answered"
        );
        Counters::bump(&self.counters.answered);

        // Registry entry is gone, so collaborator calls happen outside the
        // lock; presentation failures never overturn the outcome.
        let payload = serde_json::json!({
            "responder-id": &winner.responder_id,
            "phrase": phrase,
            "callback-data": &winner.callback_data,
        });
        if let Err(e) = self.presenter.notify(ACTION_EVENT, payload).await {
            warn!(%phrase, error = %e, "action event delivery failed");
        }
        if let Some(answer) = winner.answer.as_deref() {
            if let Err(e) = self.presenter.present(&phrase, answer).await {
                warn!(%phrase, error = %e, "presenting answer failed");
            }
        }

        Outcome::Answered(winner)
    }
}

//! Message and outcome types for the aggregator

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The highest confidence a responder can claim. A reply at this score
/// ends the wait immediately - nothing can outrank it.
pub const MAX_CONFIDENCE: f32 = 1.0;

/// Event name emitted through the Presenter when a query resolves with a winner
pub const ACTION_EVENT: &str = "query.action";

/// Errors from aggregator operations
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Query already in flight for phrase: {phrase}")]
    AlreadyOpen { phrase: String },
}

/// One responder's message for a broadcast phrase
///
/// `searching == true` is a request for more time and carries no answer.
/// `searching == false` is that responder's terminal contribution: either an
/// answer with a confidence score, or nothing ("finished, no contribution").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReply {
    #[serde(rename = "responder-id")]
    pub responder_id: String,

    /// Proposed answer text; absent for extension requests and
    /// no-contribution replies
    pub answer: Option<String>,

    /// Responder's self-reported confidence in [0, 1]
    #[serde(default)]
    pub confidence: f32,

    /// Responder is still searching and asks the aggregator to keep waiting
    #[serde(default)]
    pub searching: bool,

    /// Opaque payload handed back to the winning responder in the action event
    #[serde(rename = "callback-data", default)]
    pub callback_data: Option<serde_json::Value>,
}

impl QueryReply {
    /// Terminal reply carrying an answer
    pub fn answer(responder_id: impl Into<String>, answer: impl Into<String>, confidence: f32) -> Self {
        Self {
            responder_id: responder_id.into(),
            answer: Some(answer.into()),
            confidence,
            searching: false,
            callback_data: None,
        }
    }

    /// Extension request: still searching, keep the query open
    pub fn searching(responder_id: impl Into<String>) -> Self {
        Self {
            responder_id: responder_id.into(),
            answer: None,
            confidence: 0.0,
            searching: true,
            callback_data: None,
        }
    }

    /// Terminal reply with no contribution
    pub fn finished(responder_id: impl Into<String>) -> Self {
        Self {
            responder_id: responder_id.into(),
            answer: None,
            confidence: 0.0,
            searching: false,
            callback_data: None,
        }
    }

    /// Attach an opaque callback payload
    pub fn with_callback_data(mut self, data: serde_json::Value) -> Self {
        self.callback_data = Some(data);
        self
    }

    /// Whether this terminal reply actually contributes an answer
    ///
    /// An empty answer string counts as no contribution, matching the
    /// loose payloads some responders send.
    pub fn has_answer(&self) -> bool {
        self.answer.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// Result of resolving one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Outcome {
    /// The winning reply, picked by highest confidence, first arrival on ties
    Answered(QueryReply),

    /// No usable reply arrived within the budget
    Unanswered,
}

impl Outcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered(_))
    }

    /// The winning reply, if any
    pub fn winner(&self) -> Option<&QueryReply> {
        match self {
            Outcome::Answered(reply) => Some(reply),
            Outcome::Unanswered => None,
        }
    }
}

/// Phrase keys are normalized before use so transport-level casing and
/// padding never split one query across two registry entries.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

/// Aggregator metrics for observability
#[derive(Debug, Clone, Default)]
pub struct AggregatorMetrics {
    pub queries_started: u64,
    pub answered: u64,
    pub unanswered: u64,
    pub replies_collected: u64,
    pub extensions_granted: u64,
    pub late_replies: u64,
    pub early_completions: u64,
}

/// Shared counters behind the metrics snapshot
///
/// Atomics so the collector can count without touching the registry lock.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub queries_started: AtomicU64,
    pub answered: AtomicU64,
    pub unanswered: AtomicU64,
    pub replies_collected: AtomicU64,
    pub extensions_granted: AtomicU64,
    pub late_replies: AtomicU64,
    pub early_completions: AtomicU64,
}

impl Counters {
    pub fn snapshot(&self) -> AggregatorMetrics {
        AggregatorMetrics {
            queries_started: self.queries_started.load(Ordering::Relaxed),
            answered: self.answered.load(Ordering::Relaxed),
            unanswered: self.unanswered.load(Ordering::Relaxed),
            replies_collected: self.replies_collected.load(Ordering::Relaxed),
            extensions_granted: self.extensions_granted.load(Ordering::Relaxed),
            late_replies: self.late_replies.load(Ordering::Relaxed),
            early_completions: self.early_completions.load(Ordering::Relaxed),
        }
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

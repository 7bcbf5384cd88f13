//! Per-query mutable state, keyed by normalized phrase
//!
//! The registry itself is plain data; the aggregator wraps it in a single
//! `tokio::sync::Mutex` shared by the collector and every coordinator, which
//! serializes all mutation across phrases.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::messages::{AggregateError, QueryReply};
use super::signal::CompletionSignal;

/// State tracked for one in-flight query
#[derive(Debug)]
pub struct QueryState {
    /// Responders that asked for more time and have not yet finalized.
    /// Mutated only by the collector; cleared by the coordinator at
    /// resolution, under the same lock.
    pub pending_extensions: HashSet<String>,

    /// Responders that already sent a terminal reply for this phrase.
    /// An extension request from a finalized responder is ignored.
    pub finalized: HashSet<String>,

    /// Collected answers, arrival order preserved, append-only
    pub replies: Vec<QueryReply>,

    /// Wake-up hint scoped to this phrase, created here and dropped on close
    pub signal: Arc<CompletionSignal>,
}

impl QueryState {
    fn new() -> Self {
        Self {
            pending_extensions: HashSet::new(),
            finalized: HashSet::new(),
            replies: Vec::new(),
            signal: Arc::new(CompletionSignal::new()),
        }
    }
}

/// Registry of all in-flight queries
#[derive(Debug, Default)]
pub struct ResponseRegistry {
    queries: HashMap<String, QueryState>,
}

impl ResponseRegistry {
    pub fn new() -> Self {
        Self {
            queries: HashMap::new(),
        }
    }

    /// Start tracking a phrase and hand back its completion signal
    ///
    /// Fails with `AlreadyOpen` if the phrase is already in flight - two
    /// coordinators must never own the same phrase's state.
    pub fn open(&mut self, phrase: &str) -> Result<Arc<CompletionSignal>, AggregateError> {
        if self.queries.contains_key(phrase) {
            return Err(AggregateError::AlreadyOpen {
                phrase: phrase.to_string(),
            });
        }

        let state = QueryState::new();
        let signal = state.signal.clone();
        self.queries.insert(phrase.to_string(), state);
        debug!(%phrase, open = self.queries.len(), "query opened");

        Ok(signal)
    }

    /// Stop tracking a phrase, returning its final state
    ///
    /// Idempotent: closing an unknown phrase is a no-op returning None, so
    /// duplicate invocations from racing resolution paths are harmless.
    pub fn close(&mut self, phrase: &str) -> Option<QueryState> {
        let state = self.queries.remove(phrase);
        if state.is_some() {
            debug!(%phrase, open = self.queries.len(), "query closed");
        }
        state
    }

    pub fn is_open(&self, phrase: &str) -> bool {
        self.queries.contains_key(phrase)
    }

    pub fn open_count(&self) -> usize {
        self.queries.len()
    }

    pub(crate) fn get_mut(&mut self, phrase: &str) -> Option<&mut QueryState> {
        self.queries.get_mut(phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_empty_state() {
        let mut registry = ResponseRegistry::new();
        registry.open("capital of france").unwrap();

        assert!(registry.is_open("capital of france"));
        let state = registry.get_mut("capital of france").unwrap();
        assert!(state.pending_extensions.is_empty());
        assert!(state.replies.is_empty());
    }

    #[test]
    fn test_open_twice_fails() {
        let mut registry = ResponseRegistry::new();
        registry.open("capital of france").unwrap();

        let err = registry.open("capital of france").unwrap_err();
        assert!(matches!(err, AggregateError::AlreadyOpen { .. }));
        assert_eq!(registry.open_count(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut registry = ResponseRegistry::new();
        registry.open("capital of france").unwrap();

        assert!(registry.close("capital of france").is_some());
        assert!(registry.close("capital of france").is_none());
        assert!(!registry.is_open("capital of france"));
    }

    #[test]
    fn test_close_returns_collected_state() {
        let mut registry = ResponseRegistry::new();
        registry.open("capital of france").unwrap();
        registry
            .get_mut("capital of france")
            .unwrap()
            .replies
            .push(QueryReply::answer("wiki", "Paris", 0.9));

        let state = registry.close("capital of france").unwrap();
        assert_eq!(state.replies.len(), 1);
        assert_eq!(state.replies[0].responder_id, "wiki");
    }

    #[test]
    fn test_phrases_are_tracked_independently() {
        let mut registry = ResponseRegistry::new();
        registry.open("phrase one").unwrap();
        registry.open("phrase two").unwrap();
        assert_eq!(registry.open_count(), 2);

        registry.close("phrase one");
        assert!(!registry.is_open("phrase one"));
        assert!(registry.is_open("phrase two"));
    }
}

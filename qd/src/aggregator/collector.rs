//! Response collection from concurrent responder arrivals
//!
//! The collector is the only entry point the transport calls. It never
//! blocks beyond the registry lock: acquire, mutate, maybe fire the
//! phrase's completion signal, release.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::messages::{Counters, MAX_CONFIDENCE, QueryReply, normalize_phrase};
use super::registry::ResponseRegistry;

/// Cloneable ingest handle sharing the aggregator's registry lock
///
/// Hand one of these to the transport; it may invoke `on_response` from any
/// number of tasks concurrently.
#[derive(Clone)]
pub struct ResponseCollector {
    registry: Arc<Mutex<ResponseRegistry>>,
    counters: Arc<Counters>,
}

impl ResponseCollector {
    pub(crate) fn new(registry: Arc<Mutex<ResponseRegistry>>, counters: Arc<Counters>) -> Self {
        Self { registry, counters }
    }

    /// Ingest one responder message for a phrase
    ///
    /// Never returns an error: a reply for a phrase that is no longer open
    /// is a timing artifact of the transport, logged and dropped.
    pub async fn on_response(&self, phrase: &str, reply: QueryReply) {
        let phrase = normalize_phrase(phrase);
        let mut registry = self.registry.lock().await;

        let Some(state) = registry.get_mut(&phrase) else {
            warn!(
                %phrase,
                responder_id = %reply.responder_id,
                "answered too slowly, reply ignored"
            );
            Counters::bump(&self.counters.late_replies);
            return;
        };

        if reply.searching {
            if state.finalized.contains(&reply.responder_id) {
                debug!(
                    %phrase,
                    responder_id = %reply.responder_id,
                    "extension request after terminal reply ignored"
                );
            } else if state.pending_extensions.insert(reply.responder_id.clone()) {
                debug!(%phrase, responder_id = %reply.responder_id, "extension granted");
                Counters::bump(&self.counters.extensions_granted);
            }
            return;
        }

        // Terminal reply: this responder is done with the phrase
        let responder_id = reply.responder_id.clone();
        if reply.has_answer() {
            info!(
                %phrase,
                responder_id = %responder_id,
                confidence = reply.confidence,
                "answer collected"
            );
            let maxed_out = reply.confidence >= MAX_CONFIDENCE;
            state.replies.push(reply);
            Counters::bump(&self.counters.replies_collected);

            if maxed_out {
                // Nothing can outrank this answer, stop waiting for stragglers
                debug!(%phrase, "maximum-confidence answer, completing early");
                state.signal.set();
            }
        } else {
            debug!(%phrase, responder_id = %responder_id, "responder finished without contribution");
        }

        state.pending_extensions.remove(&responder_id);
        state.finalized.insert(responder_id);

        if state.pending_extensions.is_empty() {
            // No responder left that could still improve on what we have
            debug!(%phrase, "no responders still searching, completing early");
            state.signal.set();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn collector_with_registry() -> (ResponseCollector, Arc<Mutex<ResponseRegistry>>, Arc<Counters>) {
        let registry = Arc::new(Mutex::new(ResponseRegistry::new()));
        let counters = Arc::new(Counters::default());
        let collector = ResponseCollector::new(registry.clone(), counters.clone());
        (collector, registry, counters)
    }

    #[tokio::test]
    async fn test_late_reply_is_dropped() {
        let (collector, registry, counters) = collector_with_registry();

        collector
            .on_response("never opened", QueryReply::answer("wiki", "Paris", 0.9))
            .await;

        assert_eq!(registry.lock().await.open_count(), 0);
        assert_eq!(counters.snapshot().late_replies, 1);
    }

    #[tokio::test]
    async fn test_extension_request_is_idempotent() {
        let (collector, registry, counters) = collector_with_registry();
        registry.lock().await.open("q").unwrap();

        collector.on_response("q", QueryReply::searching("wiki")).await;
        collector.on_response("q", QueryReply::searching("wiki")).await;

        let mut guard = registry.lock().await;
        let state = guard.get_mut("q").unwrap();
        assert_eq!(state.pending_extensions.len(), 1);
        assert_eq!(counters.snapshot().extensions_granted, 1);
    }

    #[tokio::test]
    async fn test_extension_after_terminal_reply_is_ignored() {
        let (collector, registry, _counters) = collector_with_registry();
        registry.lock().await.open("q").unwrap();

        // Keep a second responder searching so the state stays interesting
        collector.on_response("q", QueryReply::searching("slow")).await;
        collector.on_response("q", QueryReply::answer("wiki", "Paris", 0.7)).await;
        collector.on_response("q", QueryReply::searching("wiki")).await;

        let mut guard = registry.lock().await;
        let state = guard.get_mut("q").unwrap();
        assert!(!state.pending_extensions.contains("wiki"));
        assert!(state.finalized.contains("wiki"));
    }

    #[tokio::test]
    async fn test_answer_is_appended_and_extension_cleared() {
        let (collector, registry, counters) = collector_with_registry();
        registry.lock().await.open("q").unwrap();

        collector.on_response("q", QueryReply::searching("wiki")).await;
        collector.on_response("q", QueryReply::answer("wiki", "Paris", 0.7)).await;

        let mut guard = registry.lock().await;
        let state = guard.get_mut("q").unwrap();
        assert_eq!(state.replies.len(), 1);
        assert!(state.pending_extensions.is_empty());
        assert_eq!(counters.snapshot().replies_collected, 1);
    }

    #[tokio::test]
    async fn test_no_contribution_reply_appends_nothing() {
        let (collector, registry, _counters) = collector_with_registry();
        registry.lock().await.open("q").unwrap();

        collector.on_response("q", QueryReply::searching("wiki")).await;
        collector.on_response("q", QueryReply::finished("wiki")).await;

        let mut guard = registry.lock().await;
        let state = guard.get_mut("q").unwrap();
        assert!(state.replies.is_empty());
        assert!(state.pending_extensions.is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_counts_as_no_contribution() {
        let (collector, registry, _counters) = collector_with_registry();
        registry.lock().await.open("q").unwrap();

        collector.on_response("q", QueryReply::answer("wiki", "  ", 0.9)).await;

        let mut guard = registry.lock().await;
        assert!(guard.get_mut("q").unwrap().replies.is_empty());
    }

    #[tokio::test]
    async fn test_max_confidence_fires_signal_despite_pending_extensions() {
        let (collector, registry, _counters) = collector_with_registry();
        let signal = registry.lock().await.open("q").unwrap();

        collector.on_response("q", QueryReply::searching("slow")).await;
        collector.on_response("q", QueryReply::answer("wiki", "Paris", 1.0)).await;

        assert!(signal.wait(Duration::from_millis(10)).await);
        let mut guard = registry.lock().await;
        assert!(!guard.get_mut("q").unwrap().pending_extensions.is_empty());
    }

    #[tokio::test]
    async fn test_draining_last_extension_fires_signal() {
        let (collector, registry, _counters) = collector_with_registry();
        let signal = registry.lock().await.open("q").unwrap();

        collector.on_response("q", QueryReply::searching("a")).await;
        collector.on_response("q", QueryReply::searching("b")).await;

        collector.on_response("q", QueryReply::answer("a", "answer a", 0.5)).await;
        // One responder still searching, signal must not have fired yet
        assert!(!signal.wait(Duration::from_millis(10)).await);

        collector.on_response("q", QueryReply::finished("b")).await;
        assert!(signal.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_phrase_is_normalized_before_lookup() {
        let (collector, registry, _counters) = collector_with_registry();
        registry.lock().await.open("capital of france").unwrap();

        collector
            .on_response("  Capital OF France ", QueryReply::answer("wiki", "Paris", 0.8))
            .await;

        let mut guard = registry.lock().await;
        assert_eq!(guard.get_mut("capital of france").unwrap().replies.len(), 1);
    }
}

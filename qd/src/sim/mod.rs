//! Loopback responder fleet
//!
//! Stands in for the external transport in the demo binary and integration
//! tests: a broadcast fans out to in-process tokio tasks, and their replies
//! are pumped back into the aggregator's collector over an mpsc channel.
//! Nothing here is a message bus - it exists so the aggregator can be
//! exercised end-to-end without one.

use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::aggregator::{Broadcaster, Presenter, QueryReply, ResponseCollector};

/// What a simulated responder does with a broadcast
#[derive(Debug, Clone)]
pub enum ResponderBehavior {
    /// Reply with an answer after the initial delay
    Answer { answer: String, confidence: f32 },

    /// Ask for more time, then answer
    SearchThenAnswer {
        answer: String,
        confidence: f32,
        search_time: Duration,
    },

    /// Ask for more time, then finish with no contribution
    SearchThenGiveUp { search_time: Duration },

    /// Never reply at all
    Silent,
}

/// One simulated responder
#[derive(Debug, Clone)]
pub struct ResponderProfile {
    pub id: String,
    /// Time before the responder's first message
    pub delay: Duration,
    pub behavior: ResponderBehavior,
}

impl ResponderProfile {
    /// Build a mixed fleet of n responders
    ///
    /// A seed makes the fleet reproducible across runs; without one the
    /// composition is fresh every time.
    pub fn random_fleet(n: usize, seed: Option<u64>) -> Vec<ResponderProfile> {
        const NAMES: [&str; 8] = [
            "wiki",
            "wolfram",
            "duckduckgo",
            "dictionary",
            "news",
            "weather",
            "music",
            "fallback",
        ];

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        (0..n)
            .map(|i| {
                let base = NAMES[i % NAMES.len()];
                let id = if i < NAMES.len() {
                    base.to_string()
                } else {
                    format!("{}-{}", base, i / NAMES.len())
                };

                let delay = Duration::from_millis(rng.random_range(50..400));
                let confidence: f32 = rng.random_range(0.35..0.95);
                let answer = format!("{} result #{}", id, rng.random_range(1..100));

                let roll: f32 = rng.random();
                let behavior = if roll < 0.15 {
                    ResponderBehavior::Silent
                } else if roll < 0.30 {
                    ResponderBehavior::SearchThenGiveUp {
                        search_time: Duration::from_millis(rng.random_range(100..600)),
                    }
                } else if roll < 0.55 {
                    ResponderBehavior::SearchThenAnswer {
                        answer,
                        confidence,
                        search_time: Duration::from_millis(rng.random_range(100..600)),
                    }
                } else {
                    ResponderBehavior::Answer { answer, confidence }
                };

                ResponderProfile {
                    id,
                    delay,
                    behavior,
                }
            })
            .collect()
    }
}

/// In-process Broadcaster fanning out to simulated responder tasks
///
/// Replies flow through the channel handed out by [`LoopbackBus::new`];
/// spawn [`LoopbackBus::pump`] to forward them into the collector.
pub struct LoopbackBus {
    profiles: Vec<ResponderProfile>,
    reply_tx: mpsc::Sender<(String, QueryReply)>,
}

impl LoopbackBus {
    pub fn new(profiles: Vec<ResponderProfile>) -> (Self, mpsc::Receiver<(String, QueryReply)>) {
        let (reply_tx, reply_rx) = mpsc::channel(64);
        (Self { profiles, reply_tx }, reply_rx)
    }

    /// Forward responder replies into the collector until the bus is dropped
    pub fn pump(collector: ResponseCollector, mut reply_rx: mpsc::Receiver<(String, QueryReply)>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some((phrase, reply)) = reply_rx.recv().await {
                collector.on_response(&phrase, reply).await;
            }
        })
    }
}

#[async_trait]
impl Broadcaster for LoopbackBus {
    async fn broadcast(&self, phrase: &str) -> Result<()> {
        let session = Uuid::now_v7();
        debug!(%session, %phrase, responders = self.profiles.len(), "fanning out to simulated fleet");

        for profile in &self.profiles {
            let profile = profile.clone();
            let phrase = phrase.to_string();
            let tx = self.reply_tx.clone();

            tokio::spawn(async move {
                tokio::time::sleep(profile.delay).await;

                // Send errors just mean the aggregator is gone; the fleet
                // does not care
                match profile.behavior {
                    ResponderBehavior::Answer { answer, confidence } => {
                        let reply = QueryReply::answer(&profile.id, answer, confidence);
                        let _ = tx.send((phrase, reply)).await;
                    }
                    ResponderBehavior::SearchThenAnswer {
                        answer,
                        confidence,
                        search_time,
                    } => {
                        let _ = tx.send((phrase.clone(), QueryReply::searching(&profile.id))).await;
                        tokio::time::sleep(search_time).await;
                        let reply = QueryReply::answer(&profile.id, answer, confidence);
                        let _ = tx.send((phrase, reply)).await;
                    }
                    ResponderBehavior::SearchThenGiveUp { search_time } => {
                        let _ = tx.send((phrase.clone(), QueryReply::searching(&profile.id))).await;
                        tokio::time::sleep(search_time).await;
                        let _ = tx.send((phrase, QueryReply::finished(&profile.id))).await;
                    }
                    ResponderBehavior::Silent => {}
                }
            });
        }

        Ok(())
    }
}

/// Presenter that prints to the terminal
pub struct ConsolePresenter;

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn present(&self, _phrase: &str, answer: &str) -> Result<()> {
        use colored::Colorize;
        println!("{} {}", "answer:".green().bold(), answer);
        Ok(())
    }

    async fn notify(&self, event: &str, payload: serde_json::Value) -> Result<()> {
        use colored::Colorize;
        let rendered = serde_json::to_string(&payload)?;
        println!("{} {}", format!("[{}]", event).dimmed(), rendered.dimmed());
        Ok(())
    }
}

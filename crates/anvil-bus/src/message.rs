// ── Signals and subscription streams ──
//
// A Signal is the unit of push traffic on the bus: a dotted topic plus a
// free-form JSON body. Subscriptions select either one exact topic or a
// whole topic family with a trailing `.*` pattern, and always yield one
// ordered stream per subscription.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Reserved topic announcing that a named service dropped off the bus.
///
/// The body is the vanished service's name as a JSON string.
pub const SERVICE_VANISHED: &str = "bus.service_vanished";

// ── Signal ──────────────────────────────────────────────────────────

/// A push notification delivered over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub topic: String,
    pub body: Value,
}

impl Signal {
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            body,
        }
    }
}

/// True when `topic` is selected by `pattern`.
///
/// A pattern is an exact topic, a family pattern ending in `.*` (selects
/// every topic under that prefix), or `*` alone (selects everything).
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix(".*") {
        Some(prefix) => topic
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.')),
        None => pattern == topic,
    }
}

// ── SignalStream ────────────────────────────────────────────────────

/// Ordered stream of signals produced by one subscription.
///
/// Signals arrive in publish order. If the consumer falls far enough
/// behind that the underlying channel drops messages, the gap is logged
/// and the stream resumes with the oldest retained signal; it never
/// errors out mid-life.
#[derive(Debug)]
pub struct SignalStream {
    receiver: broadcast::Receiver<Arc<Signal>>,
}

impl SignalStream {
    pub fn new(receiver: broadcast::Receiver<Arc<Signal>>) -> Self {
        Self { receiver }
    }

    /// Next signal, or `None` once the publishing side has gone away.
    pub async fn recv(&mut self) -> Option<Arc<Signal>> {
        loop {
            match self.receiver.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "signal stream lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

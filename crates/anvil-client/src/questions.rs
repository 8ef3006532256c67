// ── Questions domain client ──
//
// Mirrors the installer's pending-question queue. The queue is seeded
// from one snapshot fetch and then maintained purely from add/remove
// signals; order is arrival order, because consumers handle questions
// first-in first-out.

use anvil_bus::{MessageBus, Signal, SignalStream};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::model::Question;
use crate::registry::{CallbackRegistry, Subscription};
use crate::request;

const TOPIC_FAMILY: &str = "questions.*";
const QUESTION_ADDED: &str = "questions.added";
const QUESTION_REMOVED: &str = "questions.removed";
const GET_PENDING: &str = "questions.get_pending";

// ── Events ──────────────────────────────────────────────────────────

/// A change applied to the pending queue, as seen by subscribers.
#[derive(Debug, Clone)]
pub enum QuestionsEvent {
    Added { question: Question },
    Removed { id: u32 },
}

impl QuestionsEvent {
    fn from_signal(signal: &Signal) -> Option<Self> {
        let decoded = match signal.topic.as_str() {
            QUESTION_ADDED => serde_json::from_value(signal.body.clone())
                .map(|question| Self::Added { question }),
            QUESTION_REMOVED => {
                serde_json::from_value(signal.body.clone()).map(|id| Self::Removed { id })
            }
            _ => return None,
        };
        match decoded {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(topic = %signal.topic, error = %e, "dropping undecodable question signal");
                None
            }
        }
    }
}

// ── Pending queue ───────────────────────────────────────────────────

/// Insertion-ordered pending set, one entry per question id.
///
/// An add for a known id replaces the question in place without moving
/// it; an add for a new id appends. Removal shifts later entries up so
/// the remaining order still matches arrival order.
#[derive(Debug, Default)]
struct PendingQueue {
    questions: IndexMap<u32, Question>,
}

impl PendingQueue {
    fn seed(snapshot: Vec<Question>) -> Self {
        let mut queue = Self::default();
        for question in snapshot {
            queue.questions.insert(question.id, question);
        }
        queue
    }

    fn apply(&mut self, event: &QuestionsEvent) {
        match event {
            QuestionsEvent::Added { question } => {
                debug!(id = question.id, class = %question.class, "question added");
                self.questions.insert(question.id, question.clone());
            }
            QuestionsEvent::Removed { id } => {
                if self.questions.shift_remove(id).is_some() {
                    debug!(id, "question removed");
                } else {
                    debug!(id, "remove for unknown question, ignoring");
                }
            }
        }
    }

    fn snapshot(&self) -> Vec<Question> {
        self.questions.values().cloned().collect()
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Synchronized view of the installer's pending questions.
#[derive(Clone)]
pub struct QuestionsClient {
    inner: Arc<QuestionsInner>,
}

struct QuestionsInner {
    pending: watch::Receiver<Arc<Vec<Question>>>,
    events: CallbackRegistry<QuestionsEvent>,
    _cancel: DropGuard,
}

impl QuestionsClient {
    pub async fn new(bus: Arc<dyn MessageBus>) -> Result<Self, ClientError> {
        // Same ordering as the network client: subscribe first, then
        // fetch the snapshot, so an add racing the fetch is replayed as
        // a harmless in-place upsert instead of being lost.
        let stream = bus
            .subscribe(TOPIC_FAMILY)
            .await
            .map_err(ClientError::transport_unavailable)?;
        let snapshot: Vec<Question> = request::call(bus.as_ref(), GET_PENDING, Value::Null)
            .await
            .map_err(ClientError::transport_unavailable)?;

        let queue = PendingQueue::seed(snapshot);
        let (pending_tx, pending_rx) = watch::channel(Arc::new(queue.snapshot()));
        let events = CallbackRegistry::new();
        let cancel = CancellationToken::new();

        tokio::spawn(questions_loop(
            stream,
            queue,
            pending_tx,
            events.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            inner: Arc::new(QuestionsInner {
                pending: pending_rx,
                events,
                _cancel: cancel.drop_guard(),
            }),
        })
    }

    /// Snapshot of the pending queue in arrival order.
    pub fn pending(&self) -> Vec<Question> {
        self.inner.pending.borrow().as_ref().clone()
    }

    /// Subscribe to queue changes.
    pub fn on_event(
        &self,
        handler: impl Fn(&QuestionsEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.register(handler)
    }
}

async fn questions_loop(
    mut stream: SignalStream,
    mut queue: PendingQueue,
    pending: watch::Sender<Arc<Vec<Question>>>,
    events: CallbackRegistry<QuestionsEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            signal = stream.recv() => {
                let Some(signal) = signal else { break };
                let Some(event) = QuestionsEvent::from_signal(&signal) else {
                    continue;
                };
                queue.apply(&event);
                let _ = pending.send(Arc::new(queue.snapshot()));
                events.notify(&event);
            }
        }
    }
}

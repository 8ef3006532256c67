// ── In-process bus ──
//
// MemoryBus wires publishers and subscribers together inside one process.
// It backs the test suites of every crate in this workspace and doubles
// as the transport when installer services are embedded rather than
// reached over a socket.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

use crate::bus::MessageBus;
use crate::error::BusError;
use crate::message::{SERVICE_VANISHED, Signal, SignalStream, topic_matches};

const CHANNEL_CAPACITY: usize = 256;

type Handler = dyn Fn(Value) -> Result<Value, BusError> + Send + Sync;

struct SubscriptionEntry {
    pattern: String,
    sender: broadcast::Sender<Arc<Signal>>,
}

#[derive(Default)]
struct MemoryBusInner {
    handlers: HashMap<String, Arc<Handler>>,
    subscriptions: Vec<SubscriptionEntry>,
    calls: HashMap<String, usize>,
}

/// In-process [`MessageBus`].
///
/// Request handlers are registered per method; published signals fan out
/// to every live subscription whose pattern matches. The bus records how
/// many times each method was requested, and can be switched offline, at
/// which point every request and every new subscription fails as
/// unreachable while already-open streams stay as they are.
#[derive(Default)]
pub struct MemoryBus {
    inner: Mutex<MemoryBusInner>,
    offline: AtomicBool,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one request method.
    ///
    /// Re-registering a method replaces the previous handler.
    pub fn respond_to<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Result<Value, BusError> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Register a fixed successful response for one request method.
    pub fn respond_with(&self, method: impl Into<String>, response: Value) {
        self.respond_to(method, move |_| Ok(response.clone()));
    }

    /// Deliver a signal to every matching subscription.
    ///
    /// Subscriptions whose stream has been dropped are pruned as a side
    /// effect. Delivery is not gated by the offline switch; that switch
    /// models the *caller's* link, not the harness's control channel.
    pub fn publish(&self, signal: Signal) {
        let signal = Arc::new(signal);
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|sub| {
            if !topic_matches(&sub.pattern, &signal.topic) {
                return true;
            }
            sub.sender.send(Arc::clone(&signal)).is_ok()
        });
    }

    /// Announce that `service` dropped off the bus.
    pub fn vanish(&self, service: &str) {
        debug!(service, "announcing vanished service");
        self.publish(Signal::new(SERVICE_VANISHED, json!(service)));
    }

    /// Switch the bus on or off for requests and new subscriptions.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// How many times `method` has been requested, successfully or not.
    pub fn request_count(&self, method: &str) -> usize {
        self.inner.lock().calls.get(method).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn request(&self, method: &str, body: Value) -> Result<Value, BusError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BusError::unreachable("memory bus is offline"));
        }
        let handler = {
            let mut inner = self.inner.lock();
            *inner.calls.entry(method.to_owned()).or_insert(0) += 1;
            inner.handlers.get(method).map(Arc::clone)
        };
        match handler {
            Some(handler) => handler(body),
            None => Err(BusError::unknown_method(method)),
        }
    }

    async fn subscribe(&self, pattern: &str) -> Result<SignalStream, BusError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BusError::unreachable("memory bus is offline"));
        }
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let mut inner = self.inner.lock();
        inner.subscriptions.push(SubscriptionEntry {
            pattern: pattern.to_owned(),
            sender,
        });
        Ok(SignalStream::new(receiver))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn dispatches_requests_to_registered_handler() {
        let bus = MemoryBus::new();
        bus.respond_to("echo.shout", |body| Ok(json!({ "echoed": body })));

        let reply = bus.request("echo.shout", json!("hi")).await.unwrap();
        assert_eq!(reply, json!({ "echoed": "hi" }));
        assert_eq!(bus.request_count("echo.shout"), 1);
    }

    #[tokio::test]
    async fn fixed_response_is_returned_every_time() {
        let bus = MemoryBus::new();
        bus.respond_with("network.get_devices", json!([]));

        for _ in 0..3 {
            let reply = bus.request("network.get_devices", Value::Null).await.unwrap();
            assert_eq!(reply, json!([]));
        }
        assert_eq!(bus.request_count("network.get_devices"), 3);
    }

    #[tokio::test]
    async fn unregistered_method_is_an_error() {
        let bus = MemoryBus::new();
        let err = bus.request("nobody.home", Value::Null).await.unwrap_err();
        assert!(matches!(err, BusError::UnknownMethod { .. }));
        assert_eq!(bus.request_count("nobody.home"), 1);
    }

    #[tokio::test]
    async fn offline_bus_refuses_requests_and_subscriptions() {
        let bus = MemoryBus::new();
        bus.respond_with("manager.get_status", json!({}));
        bus.set_offline(true);

        let err = bus.request("manager.get_status", Value::Null).await.unwrap_err();
        assert!(matches!(err, BusError::Unreachable { .. }));
        assert!(bus.subscribe("network.*").await.is_err());

        bus.set_offline(false);
        assert!(bus.subscribe("network.*").await.is_ok());
    }

    #[tokio::test]
    async fn publish_reaches_matching_subscriptions_only() {
        let bus = MemoryBus::new();
        let mut network = bus.subscribe("network.*").await.unwrap();
        let mut questions = bus.subscribe("questions.*").await.unwrap();

        bus.publish(Signal::new("network.device_added", json!({ "name": "eth0" })));
        bus.publish(Signal::new("questions.added", json!({ "id": 1 })));

        assert_eq!(network.recv().await.unwrap().topic, "network.device_added");
        assert_eq!(questions.recv().await.unwrap().topic, "questions.added");
    }

    #[tokio::test]
    async fn vanish_announces_the_service_name() {
        let bus = MemoryBus::new();
        let mut stream = bus.subscribe(SERVICE_VANISHED).await.unwrap();

        bus.vanish("anvil.installer");

        let signal = stream.recv().await.unwrap();
        assert_eq!(signal.topic, SERVICE_VANISHED);
        assert_eq!(signal.body, json!("anvil.installer"));
    }
}

// ── Transport seam ──

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BusError;
use crate::message::SignalStream;

/// Bidirectional message-bus connection to the installer services.
///
/// Implementations provide request/response round trips addressed by
/// dotted method name (`"network.get_devices"`) and push subscriptions
/// addressed by topic pattern. One `subscribe` call yields one ordered
/// stream; a consumer that needs strict ordering across several topics
/// subscribes to their common family pattern once instead of opening a
/// stream per topic.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Perform one request/response round trip.
    async fn request(&self, method: &str, body: Value) -> Result<Value, BusError>;

    /// Open a subscription covering every topic selected by `pattern`.
    ///
    /// Fails when the bus is unreachable, which callers treat as fatal
    /// to whatever they were constructing.
    async fn subscribe(&self, pattern: &str) -> Result<SignalStream, BusError>;
}

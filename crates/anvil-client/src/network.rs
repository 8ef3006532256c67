// ── Network domain client ──
//
// One reducer task owns the device table and applies topology signals
// in delivery order. Each transition marks the connection set stale;
// the task refetches it only after draining every signal already
// queued, so a burst of events costs one round trip, not one per event.

use anvil_bus::{MessageBus, Signal, SignalStream};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::model::{Connection, Device};
use crate::registry::{CallbackRegistry, Subscription};
use crate::request;

const TOPIC_FAMILY: &str = "network.*";
const DEVICE_ADDED: &str = "network.device_added";
const DEVICE_UPDATED: &str = "network.device_updated";
const DEVICE_REMOVED: &str = "network.device_removed";
const GET_DEVICES: &str = "network.get_devices";
const GET_CONNECTIONS: &str = "network.get_connections";
const GET_CONNECTION: &str = "network.get_connection";
const DELETE_CONNECTION: &str = "network.delete_connection";

// ── Events ──────────────────────────────────────────────────────────

/// A change applied to the network model, as seen by subscribers.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    DeviceAdded {
        device: Device,
    },
    DeviceUpdated {
        name: String,
        device: Device,
    },
    DeviceRemoved {
        name: String,
    },
    /// The connection set was refetched after a topology change.
    ConnectionsChanged {
        connections: Arc<Vec<Connection>>,
    },
}

impl NetworkEvent {
    /// Decode a bus signal into a device transition.
    ///
    /// Topics outside the device family yield `None`; so do bodies that
    /// do not decode, which are logged and dropped rather than allowed
    /// to take the reducer down.
    fn from_signal(signal: &Signal) -> Option<Self> {
        let decoded = match signal.topic.as_str() {
            DEVICE_ADDED => serde_json::from_value(signal.body.clone())
                .map(|device| Self::DeviceAdded { device }),
            DEVICE_UPDATED => serde_json::from_value(signal.body.clone())
                .map(|(name, device)| Self::DeviceUpdated { name, device }),
            DEVICE_REMOVED => serde_json::from_value(signal.body.clone())
                .map(|name| Self::DeviceRemoved { name }),
            _ => return None,
        };
        match decoded {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(topic = %signal.topic, error = %e, "dropping undecodable network signal");
                None
            }
        }
    }
}

// ── Device table ────────────────────────────────────────────────────

/// Sole-writer device table; at most one entry per device name.
///
/// Transitions are idempotent: re-applying an add, update, or remove
/// leaves the same table behind.
#[derive(Debug, Default)]
struct DeviceTable {
    devices: Vec<Device>,
}

impl DeviceTable {
    /// Replace the whole table with a freshly fetched snapshot,
    /// deduplicating by name in arrival order.
    fn reset(&mut self, devices: Vec<Device>) {
        self.devices.clear();
        for device in devices {
            self.insert(device);
        }
    }

    /// Drop any same-named entry, then append.
    fn insert(&mut self, device: Device) {
        self.devices.retain(|d| d.name != device.name);
        self.devices.push(device);
    }

    /// Upsert under a possibly different old name (a rename arrives as
    /// `[old_name, new_payload]`).
    fn replace(&mut self, name: &str, device: Device) {
        self.devices.retain(|d| d.name != name);
        self.insert(device);
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.name != name);
        self.devices.len() != before
    }

    fn apply(&mut self, event: &NetworkEvent) {
        match event {
            NetworkEvent::DeviceAdded { device } => {
                debug!(name = %device.name, kind = %device.kind, "device added");
                self.insert(device.clone());
            }
            NetworkEvent::DeviceUpdated { name, device } => {
                debug!(old = %name, name = %device.name, state = %device.state, "device updated");
                self.replace(name, device.clone());
            }
            NetworkEvent::DeviceRemoved { name } => {
                if self.remove(name) {
                    debug!(name = %name, "device removed");
                } else {
                    debug!(name = %name, "remove for unknown device, ignoring");
                }
            }
            // Synthesized by the refresh path, never parsed from a signal.
            NetworkEvent::ConnectionsChanged { .. } => {}
        }
    }

    fn snapshot(&self) -> Vec<Device> {
        self.devices.clone()
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Synchronized view of the installer's network domain.
///
/// Reads return settled snapshots: they wait for an in-flight
/// connections refetch to land but never for future events. Cloning is
/// cheap; dropping the last clone stops the reducer task.
#[derive(Clone)]
pub struct NetworkClient {
    inner: Arc<NetworkInner>,
}

struct NetworkInner {
    bus: Arc<dyn MessageBus>,
    devices: watch::Receiver<Arc<Vec<Device>>>,
    connections: watch::Receiver<Arc<Vec<Connection>>>,
    refreshing: watch::Receiver<bool>,
    refresh_requests: Arc<Notify>,
    events: CallbackRegistry<NetworkEvent>,
    _cancel: DropGuard,
}

impl NetworkClient {
    pub async fn new(bus: Arc<dyn MessageBus>) -> Result<Self, ClientError> {
        // Subscribe before the snapshot fetches so nothing lands in the
        // gap; replaying an event the snapshot already reflects is
        // harmless because transitions are idempotent.
        let stream = bus
            .subscribe(TOPIC_FAMILY)
            .await
            .map_err(ClientError::transport_unavailable)?;

        let seed_devices: Vec<Device> = request::call(bus.as_ref(), GET_DEVICES, Value::Null)
            .await
            .map_err(ClientError::transport_unavailable)?;
        let seed_connections: Vec<Connection> =
            request::call(bus.as_ref(), GET_CONNECTIONS, Value::Null)
                .await
                .map_err(ClientError::transport_unavailable)?;

        let mut table = DeviceTable::default();
        table.reset(seed_devices);

        let (devices_tx, devices_rx) = watch::channel(Arc::new(table.snapshot()));
        let (connections_tx, connections_rx) = watch::channel(Arc::new(seed_connections));
        let (refreshing_tx, refreshing_rx) = watch::channel(false);
        let refresh_requests = Arc::new(Notify::new());
        let events = CallbackRegistry::new();
        let cancel = CancellationToken::new();

        let reducer = NetworkReducer {
            bus: Arc::clone(&bus),
            table,
            devices: devices_tx,
            connections: connections_tx,
            refreshing: refreshing_tx,
            events: events.clone(),
        };
        tokio::spawn(reducer.run(stream, Arc::clone(&refresh_requests), cancel.clone()));

        Ok(Self {
            inner: Arc::new(NetworkInner {
                bus,
                devices: devices_rx,
                connections: connections_rx,
                refreshing: refreshing_rx,
                refresh_requests,
                events,
                _cancel: cancel.drop_guard(),
            }),
        })
    }

    // ── Reads ──

    /// Current device snapshot.
    pub async fn devices(&self) -> Vec<Device> {
        self.settled().await;
        self.inner.devices.borrow().as_ref().clone()
    }

    /// Current connection snapshot.
    pub async fn connections(&self) -> Vec<Connection> {
        self.settled().await;
        self.inner.connections.borrow().as_ref().clone()
    }

    /// Fetch one connection straight from the service, bypassing the
    /// cached set. A remote `null` reply means no such connection.
    pub async fn connection(&self, id: &str) -> Result<Option<Connection>, ClientError> {
        request::call(self.inner.bus.as_ref(), GET_CONNECTION, json!({ "id": id })).await
    }

    // ── Writes ──

    /// Delete a connection, then schedule a refetch of the cached set.
    pub async fn delete_connection(&self, id: &str) -> Result<(), ClientError> {
        request::call_unit(
            self.inner.bus.as_ref(),
            DELETE_CONNECTION,
            json!({ "id": id }),
        )
        .await?;
        self.inner.refresh_requests.notify_one();
        Ok(())
    }

    // ── Subscriptions ──

    /// Subscribe to network model changes.
    pub fn on_event(
        &self,
        handler: impl Fn(&NetworkEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.register(handler)
    }

    /// Wait for any in-flight connections refetch to finish, so a read
    /// observes a settled model instead of a half-applied burst.
    async fn settled(&self) {
        let mut refreshing = self.inner.refreshing.clone();
        if refreshing.wait_for(|busy| !*busy).await.is_err() {
            debug!("network reducer is gone, serving the last snapshot");
        }
    }
}

// ── Reducer task ────────────────────────────────────────────────────

struct NetworkReducer {
    bus: Arc<dyn MessageBus>,
    table: DeviceTable,
    devices: watch::Sender<Arc<Vec<Device>>>,
    connections: watch::Sender<Arc<Vec<Connection>>>,
    refreshing: watch::Sender<bool>,
    events: CallbackRegistry<NetworkEvent>,
}

impl NetworkReducer {
    async fn run(
        mut self,
        mut stream: SignalStream,
        refresh_requests: Arc<Notify>,
        cancel: CancellationToken,
    ) {
        loop {
            let refresh_pending = *self.refreshing.borrow();
            // Biased order is the debounce: signals already queued are
            // drained before the refresh arm ever runs.
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                signal = stream.recv() => {
                    let Some(signal) = signal else { break };
                    if let Some(event) = NetworkEvent::from_signal(&signal) {
                        self.apply(&event);
                    }
                }
                () = refresh_requests.notified() => {
                    let _ = self.refreshing.send(true);
                }
                () = std::future::ready(()), if refresh_pending => {
                    self.refresh_connections().await;
                }
            }
        }
    }

    /// Mutate the table, publish the new snapshot, mark connections
    /// stale, and notify subscribers -- in that order, synchronously.
    fn apply(&mut self, event: &NetworkEvent) {
        self.table.apply(event);
        let _ = self.devices.send(Arc::new(self.table.snapshot()));
        let _ = self.refreshing.send(true);
        self.events.notify(event);
    }

    async fn refresh_connections(&mut self) {
        match request::call::<Vec<Connection>>(self.bus.as_ref(), GET_CONNECTIONS, Value::Null)
            .await
        {
            Ok(connections) => {
                let connections = Arc::new(connections);
                let _ = self.connections.send(Arc::clone(&connections));
                let _ = self.refreshing.send(false);
                self.events
                    .notify(&NetworkEvent::ConnectionsChanged { connections });
            }
            Err(e) => {
                // A failed refetch keeps the previous snapshot; clearing
                // it would turn one bad call into data loss.
                warn!(error = %e, "connections refresh failed, keeping previous snapshot");
                let _ = self.refreshing.send(false);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anvil_bus::{BusError, MemoryBus};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn device(name: &str) -> Device {
        serde_json::from_value(json!({ "name": name, "kind": "ethernet", "state": "up" })).unwrap()
    }

    fn added(name: &str) -> NetworkEvent {
        NetworkEvent::DeviceAdded {
            device: device(name),
        }
    }

    // ── Table transitions ──

    #[test]
    fn table_keeps_at_most_one_entry_per_name() {
        let mut table = DeviceTable::default();
        table.apply(&added("eth0"));
        table.apply(&added("eth0"));
        table.apply(&added("eth1"));

        let names: Vec<&str> = table.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "eth1"]);
    }

    #[test]
    fn second_add_wins_wholesale() {
        let mut table = DeviceTable::default();
        table.apply(&added("eth0"));

        let replacement: Device =
            serde_json::from_value(json!({ "name": "eth0", "state": "down" })).unwrap();
        table.apply(&NetworkEvent::DeviceAdded {
            device: replacement.clone(),
        });

        assert_eq!(table.snapshot(), vec![replacement]);
    }

    #[test]
    fn update_may_rename_a_device() {
        let mut table = DeviceTable::default();
        table.apply(&added("eth0"));
        table.apply(&NetworkEvent::DeviceUpdated {
            name: "eth0".to_owned(),
            device: device("eth0.100"),
        });

        let names: Vec<&str> = table.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["eth0.100"]);
    }

    #[test]
    fn update_without_preexisting_device_inserts() {
        let mut table = DeviceTable::default();
        table.apply(&NetworkEvent::DeviceUpdated {
            name: "eth0".to_owned(),
            device: device("eth0"),
        });
        assert_eq!(table.devices.len(), 1);
    }

    #[test]
    fn remove_of_absent_device_is_a_noop() {
        let mut table = DeviceTable::default();
        table.apply(&added("eth0"));
        table.apply(&NetworkEvent::DeviceRemoved {
            name: "vda".to_owned(),
        });
        assert_eq!(table.devices.len(), 1);

        table.apply(&NetworkEvent::DeviceRemoved {
            name: "eth0".to_owned(),
        });
        table.apply(&NetworkEvent::DeviceRemoved {
            name: "eth0".to_owned(),
        });
        assert!(table.devices.is_empty());
    }

    #[test]
    fn reset_deduplicates_seed_by_name() {
        let mut table = DeviceTable::default();
        table.reset(vec![device("eth0"), device("eth1"), device("eth0")]);
        assert_eq!(table.devices.len(), 2);
    }

    // ── Signal decoding ──

    #[test]
    fn decodes_the_three_device_topics() {
        let added = Signal::new(DEVICE_ADDED, json!({ "name": "eth0" }));
        assert!(matches!(
            NetworkEvent::from_signal(&added),
            Some(NetworkEvent::DeviceAdded { .. })
        ));

        let updated = Signal::new(DEVICE_UPDATED, json!(["eth0", { "name": "eth1" }]));
        assert!(matches!(
            NetworkEvent::from_signal(&updated),
            Some(NetworkEvent::DeviceUpdated { .. })
        ));

        let removed = Signal::new(DEVICE_REMOVED, json!("eth0"));
        assert!(matches!(
            NetworkEvent::from_signal(&removed),
            Some(NetworkEvent::DeviceRemoved { .. })
        ));
    }

    #[test]
    fn foreign_topics_and_broken_bodies_are_skipped() {
        let foreign = Signal::new("questions.added", json!({ "id": 1 }));
        assert!(NetworkEvent::from_signal(&foreign).is_none());

        let broken = Signal::new(DEVICE_ADDED, json!(42));
        assert!(NetworkEvent::from_signal(&broken).is_none());
    }

    // ── Reducer behavior over a live bus ──

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn seeded_bus() -> Arc<MemoryBus> {
        let bus = Arc::new(MemoryBus::new());
        bus.respond_with(GET_DEVICES, json!([]));
        bus.respond_with(GET_CONNECTIONS, json!([]));
        bus
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_events_triggers_one_connections_refetch() {
        let bus = seeded_bus();
        let client = NetworkClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();
        let baseline = bus.request_count(GET_CONNECTIONS);

        bus.publish(Signal::new(DEVICE_ADDED, json!({ "name": "vda" })));
        bus.publish(Signal::new(DEVICE_ADDED, json!({ "name": "md0" })));
        bus.publish(Signal::new(DEVICE_REMOVED, json!("vda")));
        settle().await;

        let names: Vec<String> = client.devices().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["md0"]);
        assert_eq!(bus.request_count(GET_CONNECTIONS) - baseline, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_keeps_previous_connections() {
        let bus = Arc::new(MemoryBus::new());
        bus.respond_with(GET_DEVICES, json!([]));
        bus.respond_with(GET_CONNECTIONS, json!([{ "id": "office", "devices": ["eth0"] }]));
        let client = NetworkClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        bus.respond_to(GET_CONNECTIONS, |_| {
            Err(BusError::remote(GET_CONNECTIONS, "storage is rebuilding"))
        });
        bus.publish(Signal::new(DEVICE_ADDED, json!({ "name": "eth1" })));
        settle().await;

        let connections = client.connections().await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].id, "office");
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_transitions_and_the_refetch() {
        let bus = seeded_bus();
        let client = NetworkClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log_handle = Arc::clone(&log);
        let _sub = client.on_event(move |event| {
            let tag = match event {
                NetworkEvent::DeviceAdded { .. } => "added",
                NetworkEvent::DeviceUpdated { .. } => "updated",
                NetworkEvent::DeviceRemoved { .. } => "removed",
                NetworkEvent::ConnectionsChanged { .. } => "connections",
            };
            log_handle.lock().push(tag);
        });

        bus.publish(Signal::new(DEVICE_ADDED, json!({ "name": "eth0" })));
        bus.publish(Signal::new(DEVICE_REMOVED, json!("eth0")));
        settle().await;

        assert_eq!(*log.lock(), vec!["added", "removed", "connections"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_connection_schedules_a_refetch() {
        let bus = seeded_bus();
        bus.respond_with(DELETE_CONNECTION, Value::Null);
        let client = NetworkClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();
        let baseline = bus.request_count(GET_CONNECTIONS);

        client.delete_connection("office").await.unwrap();
        settle().await;

        assert_eq!(bus.request_count(GET_CONNECTIONS) - baseline, 1);
    }

    #[tokio::test]
    async fn connection_by_id_maps_null_to_none() {
        let bus = seeded_bus();
        bus.respond_with(GET_CONNECTION, Value::Null);
        let client = NetworkClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        assert!(client.connection("ghost").await.unwrap().is_none());

        bus.respond_with(GET_CONNECTION, json!({ "id": "office" }));
        let found = client.connection("office").await.unwrap();
        assert_eq!(found.unwrap().id, "office");
    }

    #[tokio::test]
    async fn construction_fails_without_the_seed_endpoints() {
        let bus = Arc::new(MemoryBus::new());
        let result = NetworkClient::new(bus as Arc<dyn MessageBus>).await;
        assert!(matches!(
            result,
            Err(ClientError::TransportUnavailable { .. })
        ));
    }
}

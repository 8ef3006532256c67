// ── Manager domain client ──
//
// Thin wrapper over the manager service: status reads (which also back
// the facade's connectivity probe), the probe/install actions, and a
// relay that turns progress signals into typed callbacks.

use anvil_bus::{MessageBus, SignalStream};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;

use crate::error::ClientError;
use crate::model::{InstallerStatus, Progress};
use crate::registry::{CallbackRegistry, Subscription};
use crate::request;

const GET_STATUS: &str = "manager.get_status";
const PROBE: &str = "manager.probe";
const INSTALL: &str = "manager.install";
const PROGRESS: &str = "manager.progress";

/// Client for the installer's manager service.
#[derive(Clone)]
pub struct ManagerClient {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    bus: Arc<dyn MessageBus>,
    progress: CallbackRegistry<Progress>,
    _cancel: DropGuard,
}

impl ManagerClient {
    pub async fn new(bus: Arc<dyn MessageBus>) -> Result<Self, ClientError> {
        let stream = bus
            .subscribe(PROGRESS)
            .await
            .map_err(ClientError::transport_unavailable)?;

        let progress = CallbackRegistry::new();
        let cancel = CancellationToken::new();
        tokio::spawn(progress_loop(stream, progress.clone(), cancel.clone()));

        Ok(Self {
            inner: Arc::new(ManagerInner {
                bus,
                progress,
                _cancel: cancel.drop_guard(),
            }),
        })
    }

    /// Current installer status. Cheap enough to double as a liveness
    /// probe.
    pub async fn status(&self) -> Result<InstallerStatus, ClientError> {
        request::call(self.inner.bus.as_ref(), GET_STATUS, Value::Null).await
    }

    /// Ask the installer to (re)probe the hardware.
    pub async fn probe(&self) -> Result<(), ClientError> {
        request::call_unit(self.inner.bus.as_ref(), PROBE, Value::Null).await
    }

    /// Start the installation.
    pub async fn install(&self) -> Result<(), ClientError> {
        request::call_unit(self.inner.bus.as_ref(), INSTALL, Value::Null).await
    }

    /// Subscribe to progress reports from long-running manager
    /// operations.
    pub fn on_progress(&self, handler: impl Fn(&Progress) + Send + Sync + 'static) -> Subscription {
        self.inner.progress.register(handler)
    }
}

async fn progress_loop(
    mut stream: SignalStream,
    registry: CallbackRegistry<Progress>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            signal = stream.recv() => {
                let Some(signal) = signal else { break };
                match serde_json::from_value::<Progress>(signal.body.clone()) {
                    Ok(progress) => registry.notify(&progress),
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable progress signal");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anvil_bus::{BusError, MemoryBus, Signal};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn status_decodes_the_manager_reply() {
        let bus = Arc::new(MemoryBus::new());
        bus.respond_with(
            GET_STATUS,
            json!({ "phase": "config", "busy_services": ["storage"] }),
        );
        let client = ManagerClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        let status = client.status().await.unwrap();
        assert_eq!(status.phase, crate::model::InstallationPhase::Config);
        assert!(status.is_busy());
    }

    #[tokio::test]
    async fn remote_failures_surface_as_request_failed() {
        let bus = Arc::new(MemoryBus::new());
        bus.respond_to(GET_STATUS, |_| {
            Err(BusError::remote(GET_STATUS, "manager is restarting"))
        });
        let client = ManagerClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ClientError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn probe_and_install_hit_their_methods() {
        let bus = Arc::new(MemoryBus::new());
        bus.respond_with(PROBE, Value::Null);
        bus.respond_with(INSTALL, Value::Null);
        let client = ManagerClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        client.probe().await.unwrap();
        client.install().await.unwrap();
        assert_eq!(bus.request_count(PROBE), 1);
        assert_eq!(bus.request_count(INSTALL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn relays_decoded_progress_to_subscribers() {
        let bus = Arc::new(MemoryBus::new());
        let client = ManagerClient::new(Arc::clone(&bus) as Arc<dyn MessageBus>)
            .await
            .unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_handle = Arc::clone(&seen);
        let _sub = client.on_progress(move |progress| {
            seen_handle.lock().push(progress.clone());
        });

        bus.publish(Signal::new(
            PROGRESS,
            json!({ "step": 1, "total_steps": 3, "message": "Partitioning" }),
        ));
        bus.publish(Signal::new(PROGRESS, json!("not a progress payload")));
        bus.publish(Signal::new(
            PROGRESS,
            json!({ "step": 3, "total_steps": 3 }),
        ));
        settle().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].message, "Partitioning");
        assert!(seen[1].is_finished());
    }

    #[tokio::test]
    async fn construction_fails_when_the_bus_is_offline() {
        let bus = Arc::new(MemoryBus::new());
        bus.set_offline(true);
        let result = ManagerClient::new(bus as Arc<dyn MessageBus>).await;
        assert!(matches!(
            result,
            Err(ClientError::TransportUnavailable { .. })
        ));
    }
}

// ── Service liveness monitor ──

use anvil_bus::{MessageBus, SERVICE_VANISHED, SignalStream};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::registry::{CallbackRegistry, Subscription};

/// Liveness of the link to the monitored installer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectivityState {
    /// No monitor has observed the service yet.
    #[default]
    Unknown,
    /// The vanish subscription is up and the service has not vanished.
    Connected,
    /// The monitored service dropped off the bus. Terminal for this
    /// monitor; reconnecting means building a new client.
    Disconnected,
}

/// Payload delivered to disconnect subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    pub service: String,
}

/// Watches the bus-level vanish signal for one named service.
///
/// Construction subscribes to [`SERVICE_VANISHED`] and fails with
/// [`ClientError::TransportUnavailable`] when that subscription cannot
/// be opened; a monitor that could not subscribe never reports
/// connected. After the watched service vanishes the state flips to
/// `Disconnected` once and stays there; duplicate vanish deliveries are
/// dropped.
pub struct ServiceMonitor {
    state_rx: watch::Receiver<ConnectivityState>,
    registry: CallbackRegistry<Disconnected>,
    _cancel: DropGuard,
}

impl ServiceMonitor {
    pub async fn new(
        bus: &dyn MessageBus,
        service: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let service = service.into();
        let stream = bus
            .subscribe(SERVICE_VANISHED)
            .await
            .map_err(ClientError::transport_unavailable)?;

        let (state_tx, state_rx) = watch::channel(ConnectivityState::Connected);
        let registry = CallbackRegistry::new();
        let cancel = CancellationToken::new();
        tokio::spawn(monitor_loop(
            stream,
            service,
            state_tx,
            registry.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            state_rx,
            registry,
            _cancel: cancel.drop_guard(),
        })
    }

    /// Current connectivity, without subscribing.
    pub fn state(&self) -> ConnectivityState {
        *self.state_rx.borrow()
    }

    /// Watch-side view for pull-style consumers.
    pub fn watch(&self) -> watch::Receiver<ConnectivityState> {
        self.state_rx.clone()
    }

    /// Run `handler` once if the monitored service vanishes.
    pub fn on_disconnect(
        &self,
        handler: impl Fn(&Disconnected) + Send + Sync + 'static,
    ) -> Subscription {
        self.registry.register(handler)
    }
}

async fn monitor_loop(
    mut stream: SignalStream,
    service: String,
    state: watch::Sender<ConnectivityState>,
    registry: CallbackRegistry<Disconnected>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            signal = stream.recv() => {
                let Some(signal) = signal else { break };
                let Some(vanished) = signal.body.as_str() else {
                    debug!(topic = %signal.topic, "ignoring vanish signal without a service name");
                    continue;
                };
                if vanished != service {
                    debug!(service = vanished, "ignoring vanish of unrelated service");
                    continue;
                }
                if *state.borrow() == ConnectivityState::Disconnected {
                    debug!(service = %service, "duplicate vanish, already disconnected");
                    continue;
                }
                info!(service = %service, "monitored service vanished from the bus");
                let _ = state.send(ConnectivityState::Disconnected);
                registry.notify(&Disconnected {
                    service: service.clone(),
                });
            }
        }
    }
}

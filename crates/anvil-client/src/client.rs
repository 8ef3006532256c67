// ── Installer client facade ──
//
// Composition root: builds one instance of each domain client over a
// shared bus handle and hands out cheap clones. Construction is all or
// nothing; a facade either has every domain working or does not exist.

use anvil_bus::MessageBus;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::issues::{IssuesClient, SoftwareClient, StorageClient};
use crate::manager::ManagerClient;
use crate::monitor::{ConnectivityState, Disconnected, ServiceMonitor};
use crate::network::NetworkClient;
use crate::questions::QuestionsClient;
use crate::registry::Subscription;

/// Entry point for talking to a running installer.
#[derive(Clone)]
pub struct InstallerClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    monitor: ServiceMonitor,
    manager: ManagerClient,
    network: NetworkClient,
    questions: QuestionsClient,
    storage: StorageClient,
    software: SoftwareClient,
    issues: IssuesClient,
}

impl InstallerClient {
    /// Compose every domain client over an already-connected bus.
    ///
    /// If any domain fails to come up, the error propagates and the
    /// clients built so far are dropped, which stops their tasks; a
    /// partially working facade is never returned.
    pub async fn connect(
        config: ClientConfig,
        bus: Arc<dyn MessageBus>,
    ) -> Result<Self, ClientError> {
        let monitor = ServiceMonitor::new(bus.as_ref(), config.service.as_str()).await?;
        let manager = ManagerClient::new(Arc::clone(&bus)).await?;
        let network = NetworkClient::new(Arc::clone(&bus)).await?;
        let questions = QuestionsClient::new(Arc::clone(&bus)).await?;
        let storage = StorageClient::new(Arc::clone(&bus));
        let software = SoftwareClient::new(bus);
        let issues = IssuesClient::new(storage.clone(), software.clone());

        info!(address = %config.address, service = %config.service, "installer client ready");
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                monitor,
                manager,
                network,
                questions,
                storage,
                software,
                issues,
            }),
        })
    }

    // ── Domain accessors ──

    pub fn manager(&self) -> ManagerClient {
        self.inner.manager.clone()
    }

    pub fn network(&self) -> NetworkClient {
        self.inner.network.clone()
    }

    pub fn questions(&self) -> QuestionsClient {
        self.inner.questions.clone()
    }

    pub fn storage(&self) -> StorageClient {
        self.inner.storage.clone()
    }

    pub fn software(&self) -> SoftwareClient {
        self.inner.software.clone()
    }

    pub fn issues(&self) -> IssuesClient {
        self.inner.issues.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ── Connectivity ──

    /// Round-trip liveness probe against the manager service.
    ///
    /// Never errors: any failure, whatever its reason, reads as "not
    /// connected".
    pub async fn is_connected(&self) -> bool {
        match self.inner.manager.status().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }

    /// Last state the service monitor observed.
    pub fn connectivity(&self) -> ConnectivityState {
        self.inner.monitor.state()
    }

    /// Subscribe to the disconnect notification. Fires at most once
    /// per facade; there is no automatic reconnection.
    pub fn on_disconnect(
        &self,
        handler: impl Fn(&Disconnected) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.monitor.on_disconnect(handler)
    }
}

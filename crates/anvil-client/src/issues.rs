// ── Issue sources and aggregation ──
//
// Storage and software each report their own problem list. The
// aggregator concatenates them at read time on every call; it holds no
// cache and no subscription, so a result always reflects the sources
// as they answered just now.

use anvil_bus::MessageBus;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ClientError;
use crate::model::Issue;
use crate::request;

const STORAGE_GET_ISSUES: &str = "storage.get_issues";
const SOFTWARE_GET_ISSUES: &str = "software.get_issues";

/// Read client for the storage service.
#[derive(Clone)]
pub struct StorageClient {
    bus: Arc<dyn MessageBus>,
}

impl StorageClient {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Problems the storage proposal currently has.
    pub async fn issues(&self) -> Result<Vec<Issue>, ClientError> {
        request::call(self.bus.as_ref(), STORAGE_GET_ISSUES, Value::Null).await
    }
}

/// Read client for the software service.
#[derive(Clone)]
pub struct SoftwareClient {
    bus: Arc<dyn MessageBus>,
}

impl SoftwareClient {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Problems the software proposal currently has.
    pub async fn issues(&self) -> Result<Vec<Issue>, ClientError> {
        request::call(self.bus.as_ref(), SOFTWARE_GET_ISSUES, Value::Null).await
    }
}

/// Aggregated view over every issue source, storage first.
///
/// A failure from either source fails the whole call; a partial list
/// would read as "fewer problems than there are".
#[derive(Clone)]
pub struct IssuesClient {
    storage: StorageClient,
    software: SoftwareClient,
}

impl IssuesClient {
    pub fn new(storage: StorageClient, software: SoftwareClient) -> Self {
        Self { storage, software }
    }

    pub async fn issues(&self) -> Result<Vec<Issue>, ClientError> {
        let mut issues = self.storage.issues().await?;
        issues.extend(self.software.issues().await?);
        Ok(issues)
    }
}

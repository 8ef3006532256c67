// ── Request plumbing shared by the domain clients ──

use anvil_bus::MessageBus;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

/// One request round trip with a typed reply.
///
/// Both transport failure and an undecodable reply body count as the
/// call failing; neither reaches any model state.
pub(crate) async fn call<T>(
    bus: &dyn MessageBus,
    method: &str,
    body: Value,
) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let reply = bus
        .request(method, body)
        .await
        .map_err(|e| ClientError::request_failed(method, e))?;
    serde_json::from_value(reply).map_err(|e| ClientError::request_failed(method, e))
}

/// One request round trip whose reply body does not matter.
pub(crate) async fn call_unit(
    bus: &dyn MessageBus,
    method: &str,
    body: Value,
) -> Result<(), ClientError> {
    bus.request(method, body)
        .await
        .map_err(|e| ClientError::request_failed(method, e))?;
    Ok(())
}

use crate::status::types::ContainerReport;

use anyhow::Result;
use async_trait::async_trait;

/// Capability to persist the latest report for a container.
///
/// Implementations make a single attempt per call: no retries, no batching.
/// Every error is treated the same by the caller, so there is no need to
/// distinguish transient from permanent failures.
#[async_trait]
pub trait StatusStore: Send + Sync + 'static {
    /// Stores `report` under `key`, replacing any previous value.
    async fn put(&self, key: &str, report: &ContainerReport) -> Result<()>;
}

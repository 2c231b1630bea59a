use crate::status::types::ContainerReport;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;

/// Default period between retries of buffered reports.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);
/// Default number of commands the intake channel holds before submitters wait.
pub const DEFAULT_INTAKE_CAPACITY: usize = 64;
/// Default bound on how long a submitter waits for the handoff.
pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_secs(15);

/// Tunables for the serializer actor and its handles.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// How often the pending buffer is retried.
    pub retry_interval: Duration,
    pub intake_capacity: usize,
    /// How long `submit` waits for room in the intake before giving up.
    pub handoff_timeout: Duration,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            handoff_timeout: DEFAULT_HANDOFF_TIMEOUT,
        }
    }
}

/// Messages accepted by the serializer loop.
///
/// Everything that reads or mutates serializer state goes through here.
#[derive(Debug)]
pub enum Command {
    /// A new report to deduplicate and persist.
    Update(ContainerReport),
    /// Retry the pending buffer now instead of waiting for the next tick.
    Flush,
    Stats(oneshot::Sender<SerializerStats>),
    Lookup(String, oneshot::Sender<EntityView>),
}

/// Counters and sizes reported by `/api/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerStats {
    /// Containers with a confirmed write.
    pub committed: usize,
    /// Containers with a report waiting for retry.
    pub pending: usize,
    /// Reports that passed dedup.
    pub accepted: u64,
    /// Reports dropped as stale, duplicate or superseded.
    pub discarded: u64,
    pub write_attempts: u64,
    pub write_failures: u64,
}

/// What the serializer currently knows about one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    pub committed: Option<ContainerReport>,
    pub pending: Option<ContainerReport>,
}

impl EntityView {
    pub fn is_empty(&self) -> bool {
        self.committed.is_none() && self.pending.is_none()
    }
}

/// The serializer's in-memory state, handed back when the loop exits.
#[derive(Debug, Default)]
pub struct SerializerState {
    /// Last report confirmed written, per container.
    pub committed: HashMap<String, ContainerReport>,
    /// Newest report whose write failed, per container.
    pub pending: HashMap<String, ContainerReport>,
    pub stats: SerializerStats,
}

/// Failures visible to submitters. Store errors never appear here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializerError {
    /// The handoff did not complete before the submitter's deadline; the report was dropped.
    #[error("cancelled before the update was queued")]
    Cancelled,
    /// The serializer loop is no longer running.
    #[error("serializer is not running")]
    Stopped,
}

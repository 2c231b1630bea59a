use super::store::StatusStore;
use crate::status::types::ContainerReport;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-process key/value store standing in for a remote database.
///
/// It can be told to fail a fraction of writes at random, or to refuse every
/// write until restarted, so the serializer's retry path can be watched live.
pub struct MemoryStore {
    data: DashMap<String, ContainerReport>,
    /// Probability in `[0.0, 1.0]` that a single put fails.
    failure_rate: f64,
    /// While set, every put fails as if the remote were unreachable.
    disabled: AtomicBool,
}

impl MemoryStore {
    /// Creates a store that never fails on its own.
    pub fn new() -> Self {
        Self::with_failure_rate(0.0)
    }

    /// Creates a store that fails each put with probability `failure_rate`.
    pub fn with_failure_rate(failure_rate: f64) -> Self {
        Self {
            data: DashMap::new(),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            disabled: AtomicBool::new(false),
        }
    }

    /// Simulates the remote going away.
    pub fn stop(&self) {
        self.disabled.store(true, Ordering::SeqCst);
        tracing::info!("Memory store stopped, writes will fail");
    }

    /// Brings the simulated remote back.
    pub fn start(&self) {
        self.disabled.store(false, Ordering::SeqCst);
        tracing::info!("Memory store started");
    }

    pub fn is_available(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<ContainerReport> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn should_fail(&self) -> bool {
        if !self.is_available() {
            return true;
        }
        self.failure_rate > 0.0 && rand::random::<f64>() < self.failure_rate
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn put(&self, key: &str, report: &ContainerReport) -> Result<()> {
        if self.should_fail() {
            return Err(anyhow::anyhow!("simulated unreachable store"));
        }

        tracing::info!(
            "Stored {} for container {} (observed {})",
            report.status,
            key,
            report.observed_at
        );
        self.data.insert(key.to_string(), report.clone());

        Ok(())
    }
}

//! Serializer Loop
//!
//! A single task owns the committed and pending maps. It waits on whichever comes
//! first: shutdown, a retry tick, or a command from the intake channel, and handles
//! each one to completion before looking at the next.
//!
//! ## Write path
//! 1. **Dedup**: a report not strictly newer than the committed report, or than the
//!    buffered pending report, for its container is dropped without touching the store.
//! 2. **Write**: the store is awaited. Success records the report as committed and
//!    clears any pending report it covers.
//! 3. **Buffer**: failure replaces the container's pending report. The submitter
//!    never hears about it.
//! 4. **Retry**: every tick re-runs step 2 for each pending report, indefinitely.

use super::handle::SerializerHandle;
use super::types::*;
use crate::status::types::ContainerReport;
use crate::storage::StatusStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

pub struct UpdateSerializer {
    store: Arc<dyn StatusStore>,
    state: SerializerState,
    retry_interval: Duration,
    intake: mpsc::Receiver<Command>,
}

impl UpdateSerializer {
    /// Creates the serializer and the handle used to feed it.
    ///
    /// Nothing is processed until `run` is awaited.
    pub fn new(store: Arc<dyn StatusStore>, config: SerializerConfig) -> (Self, SerializerHandle) {
        let (tx, rx) = mpsc::channel(config.intake_capacity.max(1));

        let serializer = Self {
            store,
            state: SerializerState::default(),
            retry_interval: config.retry_interval.max(MIN_RETRY_INTERVAL),
            intake: rx,
        };

        (serializer, SerializerHandle::new(tx, config.handoff_timeout))
    }

    /// Runs until `shutdown` resolves and returns the state held at that moment.
    ///
    /// Pending reports and commands still queued in the intake are dropped.
    pub async fn run<F>(mut self, shutdown: F) -> SerializerState
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Serializer started (retry every {:?})", self.retry_interval);

        let mut tick = tokio::time::interval_at(
            Instant::now() + self.retry_interval,
            self.retry_interval,
        );
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let mut intake_open = true;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                _ = tick.tick() => self.flush_pending().await,

                command = self.intake.recv(), if intake_open => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        tracing::info!("All serializer handles dropped, only retrying pending reports");
                        intake_open = false;
                    }
                },
            }
        }

        if !self.state.pending.is_empty() {
            tracing::warn!(
                "Serializer stopping with {} unpersisted reports, they will be lost",
                self.state.pending.len()
            );
        }
        tracing::info!("Serializer stopped");

        self.state.stats = self.stats();
        self.state
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Update(report) => self.apply_update(report).await,
            Command::Flush => self.flush_pending().await,
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Command::Lookup(container_id, reply) => {
                let _ = reply.send(self.view(&container_id));
            }
        }
    }

    async fn apply_update(&mut self, report: ContainerReport) {
        if let Some(held_by) = self.superseded_by(&report) {
            self.state.stats.discarded += 1;
            tracing::debug!(
                "Discarding report {} for container {}: not newer than {} report",
                report.message_id,
                report.container_id,
                held_by
            );
            return;
        }

        self.state.stats.accepted += 1;
        self.write(report).await;
    }

    /// Names the map holding a report at least as new as `report`, if any.
    fn superseded_by(&self, report: &ContainerReport) -> Option<&'static str> {
        let key = &report.container_id;

        if let Some(committed) = self.state.committed.get(key)
            && !report.is_newer_than(committed)
        {
            return Some("committed");
        }

        if let Some(pending) = self.state.pending.get(key)
            && !report.is_newer_than(pending)
        {
            return Some("pending");
        }

        None
    }

    async fn write(&mut self, report: ContainerReport) {
        let key = report.container_id.clone();
        self.state.stats.write_attempts += 1;

        match self.store.put(&key, &report).await {
            Ok(()) => {
                if self
                    .state
                    .pending
                    .get(&key)
                    .is_some_and(|pending| !pending.is_newer_than(&report))
                {
                    self.state.pending.remove(&key);
                }
                tracing::debug!("Committed report {} for container {}", report.message_id, key);
                self.state.committed.insert(key, report);
            }
            Err(e) => {
                self.state.stats.write_failures += 1;
                tracing::warn!("Failed to store container {}, buffering for retry: {}", key, e);
                self.state.pending.insert(key, report);
            }
        }
    }

    async fn flush_pending(&mut self) {
        if self.state.pending.is_empty() {
            return;
        }

        let due: Vec<ContainerReport> = self.state.pending.values().cloned().collect();
        tracing::debug!("Retrying {} pending reports", due.len());

        for report in due {
            self.write(report).await;
        }
    }

    fn stats(&self) -> SerializerStats {
        SerializerStats {
            committed: self.state.committed.len(),
            pending: self.state.pending.len(),
            ..self.state.stats.clone()
        }
    }

    fn view(&self, container_id: &str) -> EntityView {
        EntityView {
            committed: self.state.committed.get(container_id).cloned(),
            pending: self.state.pending.get(container_id).cloned(),
        }
    }
}

use super::types::*;
use crate::status::types::ContainerReport;

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Cloneable entry point into the serializer loop.
///
/// Safe to use from any number of tasks at once. Every method resolves once the
/// command has been queued (or answered, for queries); none of them wait for a
/// store write.
#[derive(Debug, Clone)]
pub struct SerializerHandle {
    intake: mpsc::Sender<Command>,
    handoff_timeout: Duration,
}

impl SerializerHandle {
    pub(super) fn new(intake: mpsc::Sender<Command>, handoff_timeout: Duration) -> Self {
        Self {
            intake,
            handoff_timeout,
        }
    }

    /// Queues a report for dedup and persistence.
    ///
    /// `Ok` acknowledges receipt only. If the handoff does not finish within the
    /// handoff timeout the report is dropped and `Cancelled` is returned.
    pub async fn submit(&self, report: ContainerReport) -> Result<(), SerializerError> {
        self.send(Command::Update(report)).await
    }

    /// Asks the loop to retry every pending report now.
    pub async fn flush(&self) -> Result<(), SerializerError> {
        self.send(Command::Flush).await
    }

    pub async fn stats(&self) -> Result<SerializerStats, SerializerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stats(tx)).await?;
        rx.await.map_err(|_| SerializerError::Stopped)
    }

    pub async fn lookup(&self, container_id: &str) -> Result<EntityView, SerializerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Lookup(container_id.to_string(), tx))
            .await?;
        rx.await.map_err(|_| SerializerError::Stopped)
    }

    /// True once the serializer loop has exited.
    pub fn is_closed(&self) -> bool {
        self.intake.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), SerializerError> {
        match tokio::time::timeout(self.handoff_timeout, self.intake.send(command)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SerializerError::Stopped),
            Err(_) => Err(SerializerError::Cancelled),
        }
    }
}

//! Runtime Configuration
//!
//! Every option can be given as a flag or through its `STATUS_RELAY_*` environment variable.

use crate::serializer::SerializerConfig;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// In-process map, optionally failing at `--failure-rate`.
    Memory,
    /// HTTP key/value node at `--remote-url`.
    Remote,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "status-relay",
    version,
    about = "Accepts container status reports and persists the latest one per container"
)]
pub struct Config {
    /// Address the HTTP API listens on.
    #[arg(long, env = "STATUS_RELAY_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Period between retries of reports that failed to persist.
    #[arg(long, env = "STATUS_RELAY_RETRY_INTERVAL_MS", default_value_t = 3_000)]
    pub retry_interval_ms: u64,

    /// How long a request waits to hand its report to the serializer.
    #[arg(long, env = "STATUS_RELAY_HANDOFF_TIMEOUT_MS", default_value_t = 15_000)]
    pub handoff_timeout_ms: u64,

    #[arg(long, env = "STATUS_RELAY_INTAKE_CAPACITY", default_value_t = 64)]
    pub intake_capacity: usize,

    #[arg(long, env = "STATUS_RELAY_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    /// Base URL of the remote node, required with `--store remote`.
    #[arg(long, env = "STATUS_RELAY_REMOTE_URL")]
    pub remote_url: Option<String>,

    #[arg(long, env = "STATUS_RELAY_REMOTE_TIMEOUT_MS", default_value_t = 500)]
    pub remote_timeout_ms: u64,

    /// Fraction of memory-store writes that fail, for exercising retries.
    #[arg(long, env = "STATUS_RELAY_FAILURE_RATE", default_value_t = 0.0)]
    pub failure_rate: f64,
}

impl Config {
    /// Rejects option combinations the relay cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval_ms == 0 {
            anyhow::bail!("--retry-interval-ms must be greater than zero");
        }
        if self.handoff_timeout_ms == 0 {
            anyhow::bail!("--handoff-timeout-ms must be greater than zero");
        }
        if self.intake_capacity == 0 {
            anyhow::bail!("--intake-capacity must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            anyhow::bail!(
                "--failure-rate must be between 0.0 and 1.0, got {}",
                self.failure_rate
            );
        }
        if self.store == StoreKind::Remote
            && self.remote_url.as_deref().is_none_or(|url| url.trim().is_empty())
        {
            anyhow::bail!("--remote-url is required with --store remote");
        }
        Ok(())
    }

    pub fn serializer(&self) -> SerializerConfig {
        SerializerConfig {
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            intake_capacity: self.intake_capacity,
            handoff_timeout: Duration::from_millis(self.handoff_timeout_ms),
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

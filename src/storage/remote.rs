use super::protocol::{ENDPOINT_PUT, PutRequest, PutResponse};
use super::store::StatusStore;
use crate::status::types::ContainerReport;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Writes reports into a remote key/value node over HTTP.
///
/// One request per `put`, bounded by `timeout`. Retrying is the serializer's job.
pub struct RemoteStore {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn put_url(&self) -> String {
        format!("{}{}", self.base_url, ENDPOINT_PUT)
    }
}

#[async_trait]
impl StatusStore for RemoteStore {
    async fn put(&self, key: &str, report: &ContainerReport) -> Result<()> {
        let payload = PutRequest {
            op_id: Uuid::new_v4().to_string(),
            key: key.to_string(),
            value_json: serde_json::to_string(report)?,
        };

        let response = self
            .http_client
            .post(self.put_url())
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Put failed {}", response.status()));
        }

        let body: PutResponse = response.json().await?;
        if !body.success {
            return Err(anyhow::anyhow!("Put rejected by remote for key {}", key));
        }

        tracing::debug!("Stored container {} remotely (op {})", key, payload.op_id);
        Ok(())
    }
}

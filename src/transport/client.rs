//! Outbound peer calls.
//!
//! `PeerClient` is the seam between the coordinator and the network. The HTTP
//! implementation talks to the endpoints in `protocol`; tests substitute an
//! in-memory double.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::protocol::*;
use crate::membership::types::NodeIdentity;
use crate::replication::types::ReplicationOutcome;

#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Stores a replica in `target`'s local store only.
    async fn local_write(
        &self,
        target: &NodeIdentity,
        op_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<()>;

    /// Hands a write to `target` acting as primary; returns its outcome list.
    async fn forward_write(
        &self,
        target: &NodeIdentity,
        op_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<ReplicationOutcome>>;

    /// Reads `target`'s local store only. `Ok(None)` is a miss.
    async fn local_read(&self, target: &NodeIdentity, key: &str) -> Result<Option<Value>>;
}

/// `PeerClient` over HTTP/JSON.
///
/// Each call is bounded by `timeout`. With `attempts > 1` a failed send is
/// retried with exponential backoff and jitter.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
    attempts: usize,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration, attempts: usize) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
            attempts: attempts.max(1),
        }
    }

    fn url(target: &NodeIdentity, endpoint: &str) -> String {
        format!("http://{}{}", target.address(), endpoint)
    }

    /// Sends the request built by `build`, rebuilding it for each attempt.
    /// Only transport errors are retried; any HTTP answer is returned as is.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut delay_ms = 150u64;
        let mut attempt = 1;

        loop {
            match build().timeout(self.timeout).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt >= self.attempts => return Err(e.into()),
                Err(e) => {
                    tracing::debug!("Peer call attempt {}/{} failed: {}", attempt, self.attempts, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn local_write(
        &self,
        target: &NodeIdentity,
        op_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<()> {
        let payload = ReplicateRequest {
            op_id: op_id.to_string(),
            key: key.to_string(),
            value_json: serde_json::to_string(value)?,
        };
        let url = Self::url(target, ENDPOINT_REPLICATE);
        let response = self
            .send_with_retry(|| self.http_client.post(&url).json(&payload))
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Replication failed: {}", response.status()));
        }
        Ok(())
    }

    async fn forward_write(
        &self,
        target: &NodeIdentity,
        op_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<ReplicationOutcome>> {
        let payload = ForwardPutRequest {
            op_id: op_id.to_string(),
            key: key.to_string(),
            value_json: serde_json::to_string(value)?,
        };
        let url = Self::url(target, ENDPOINT_FORWARD_PUT);
        let response = self
            .send_with_retry(|| self.http_client.post(&url).json(&payload))
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("ForwardPut failed {}", response.status()));
        }

        let body: WriteResponse = response.json().await?;
        Ok(body.outcomes)
    }

    async fn local_read(&self, target: &NodeIdentity, key: &str) -> Result<Option<Value>> {
        // The key goes in the query string: path segments cannot carry
        // "", "." or "..".
        let url = Self::url(target, ENDPOINT_GET_INTERNAL);
        let query = KeyQuery {
            key: key.to_string(),
        };
        let response = self
            .send_with_retry(|| self.http_client.get(&url).query(&query))
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("GET request failed {}", response.status()));
        }

        let get_response: GetResponse = response.json().await?;

        match get_response.value_json {
            Some(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            None => Ok(None),
        }
    }
}

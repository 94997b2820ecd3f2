//! Reqwest-based implementation of the [`Oracle`] trait.
//!
//! Thin adapter around `reqwest::Client` configured so that consecutive
//! submissions cannot share a keep-alive connection: a reused connection
//! skips the TCP handshake and would skew the latency comparisons the
//! timing extractor depends on.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONNECTION;
use url::Url;

use super::oracle::{Oracle, OracleError};
use super::types::Observation;

/// Reqwest-backed oracle transport.
pub struct ReqwestOracle {
    client: Client,
}

impl ReqwestOracle {
    /// Creates a client with the connection pool disabled and a per-request
    /// timeout so an unreachable device surfaces as a transport error
    /// instead of a hang.
    pub fn new(request_timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(request_timeout)
            .build()
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client. Connection pooling should already be
    /// disabled; otherwise inter-request latencies are not comparable.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn timed(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Observation, OracleError> {
        let started = Instant::now();
        let response = request
            .header(CONNECTION, "close")
            .send()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        let payload = response
            .bytes()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        let elapsed = started.elapsed();

        Ok(Observation { elapsed, payload })
    }
}

#[async_trait]
impl Oracle for ReqwestOracle {
    async fn submit(
        &self,
        target: &Url,
        field: &str,
        value: &str,
    ) -> Result<Observation, OracleError> {
        let form = HashMap::from([(field, value)]);
        self.timed(self.client.post(target.as_str()).form(&form))
            .await
    }

    async fn fetch(&self, target: &Url) -> Result<Observation, OracleError> {
        self.timed(self.client.get(target.as_str())).await
    }
}

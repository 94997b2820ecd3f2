//! Oracle submission contract.
//!
//! An oracle is any remote endpoint whose externally observable behaviour
//! (latency, reply content) leaks information about a secret it holds. The
//! contract is deliberately narrow: one candidate value in, one timed
//! observation out. Everything the simple request/response puzzles need is
//! reachable through this same surface, so no puzzle gets a bespoke client.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::types::Observation;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Contract abstracting one timed request/response exchange with the device.
///
/// Implementations must not reuse connections, pipeline, or batch requests
/// in ways that distort latency comparability between calls; each call is
/// one independent round trip, and no state is retained between calls.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// POST `field=value` as a form body to `target` and time the exchange.
    async fn submit(
        &self,
        target: &Url,
        field: &str,
        value: &str,
    ) -> Result<Observation, OracleError>;

    /// Plain GET observation of `target`, timed the same way.
    async fn fetch(&self, target: &Url) -> Result<Observation, OracleError>;
}

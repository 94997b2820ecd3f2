//! High level prober orchestration.
//!
//! Wires the configured oracle transport and the challenge runner into an
//! ergonomic entry point able to sweep a device's puzzles in one call.

use std::sync::Arc;

use thiserror::Error;

use crate::config::ProberConfig;
use crate::probes::core::{Oracle, OracleError, ReqwestOracle};
use crate::runner::{Challenge, ChallengeReport, ChallengeRunner};

/// Result alias used across the orchestration layer.
pub type ProberResult<T> = Result<T, ProberError>;

/// High-level error surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum ProberError {
    #[error("oracle client error: {0}")]
    Oracle(#[from] OracleError),
}

/// Default challenge sequence for a stock device: the passive broadcast
/// window first (it is time-boxed either way), then the active trigger,
/// then the slow timing extraction last since it dominates wall-clock cost.
pub fn default_challenges() -> Vec<Challenge> {
    vec![
        Challenge::BroadcastListen,
        Challenge::TriggerProbe,
        Challenge::TimingAttack,
    ]
}

/// Main prober orchestrator.
pub struct DeviceProber {
    config: ProberConfig,
    oracle: Arc<dyn Oracle>,
}

impl DeviceProber {
    /// Construct a prober with default configuration.
    pub fn new() -> ProberResult<Self> {
        Self::with_config(ProberConfig::default())
    }

    pub fn with_config(config: ProberConfig) -> ProberResult<Self> {
        let oracle = Arc::new(ReqwestOracle::new(config.request_timeout)?);
        Ok(Self { config, oracle })
    }

    /// Swap in a custom oracle transport (tests, alternate devices).
    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Sweep the default challenge sequence.
    pub async fn run(&self) -> Vec<ChallengeReport> {
        self.run_challenges(&default_challenges()).await
    }

    /// Run an explicit challenge sequence, one challenge at a time.
    pub async fn run_challenges(&self, challenges: &[Challenge]) -> Vec<ChallengeReport> {
        ChallengeRunner::new(self.oracle.as_ref(), &self.config)
            .run_all(challenges)
            .await
    }
}

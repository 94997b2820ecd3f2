//! Challenge sequencing.
//!
//! Drives each configured challenge through the matching probe capability
//! and collects per-challenge outcomes. Challenges are independent and run
//! strictly one after another; one failure or silent timeout never aborts
//! the rest of the run. Callers wanting an overall wall-clock budget compose
//! it out of the per-call deadlines in the config.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::ProberConfig;
use crate::probes::core::{Oracle, OracleError, PacketFilter};
use crate::probes::timing::{ExtractError, TimingExtractor};
use crate::probes::udp::{
    ListenOutcome, ListenerError, ProbeError, ProbeOutcome, listen, probe,
};

/// One network puzzle the runner knows how to drive.
///
/// The simple request/response puzzles all reduce to `FlagFetch`: observe an
/// endpoint and read a named field out of its JSON payload. Anything needing
/// more than that one generic capability has a variant of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// GET an endpoint and read a named field out of its JSON payload.
    FlagFetch { path: String, field: String },
    /// Character-by-character timing side-channel extraction.
    TimingAttack,
    /// Passively wait for the device's broadcast on the reply port.
    BroadcastListen,
    /// Send the trigger payload and wait for the reply datagram.
    TriggerProbe,
}

/// Wrapper around individual probe error types.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("timing extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),
    #[error("field '{0}' missing from oracle payload")]
    MissingField(String),
    #[error("invalid challenge url: {0}")]
    Url(#[from] url::ParseError),
}

/// Terminal outcome of one challenge.
#[derive(Debug)]
pub enum ChallengeOutcome {
    /// Secret recovered.
    Secret(String),
    /// A bounded wait expired without data. Normal, non-fatal.
    NoResponse,
    /// Hard failure, confined to this challenge.
    Failed(ChallengeError),
}

#[derive(Debug)]
pub struct ChallengeReport {
    pub challenge: Challenge,
    pub outcome: ChallengeOutcome,
}

/// Coordinates probe selection and sequential execution.
pub struct ChallengeRunner<'a> {
    oracle: &'a dyn Oracle,
    config: &'a ProberConfig,
}

impl<'a> ChallengeRunner<'a> {
    pub fn new(oracle: &'a dyn Oracle, config: &'a ProberConfig) -> Self {
        Self { oracle, config }
    }

    /// Run every challenge in order, absorbing per-challenge failures.
    pub async fn run_all(&self, challenges: &[Challenge]) -> Vec<ChallengeReport> {
        let mut reports = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            let outcome = match self.run(challenge).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::warn!("challenge {challenge:?} failed: {err}");
                    ChallengeOutcome::Failed(err)
                }
            };
            match &outcome {
                ChallengeOutcome::Secret(secret) => {
                    log::info!("challenge {challenge:?} recovered {secret:?}");
                }
                ChallengeOutcome::NoResponse => {
                    log::info!("challenge {challenge:?}: no response within deadline");
                }
                ChallengeOutcome::Failed(_) => {}
            }
            reports.push(ChallengeReport {
                challenge: challenge.clone(),
                outcome,
            });
        }
        reports
    }

    /// Run a single challenge through its probe capability.
    pub async fn run(&self, challenge: &Challenge) -> Result<ChallengeOutcome, ChallengeError> {
        match challenge {
            Challenge::FlagFetch { path, field } => {
                let target = self.config.base_url.join(path)?;
                let observation = self.oracle.fetch(&target).await?;
                let secret = observation
                    .json_field(field)
                    .ok_or_else(|| ChallengeError::MissingField(field.clone()))?;
                Ok(ChallengeOutcome::Secret(secret))
            }
            Challenge::TimingAttack => {
                let timing = &self.config.timing;
                let target = self.config.base_url.join(&timing.path)?;
                let extractor = TimingExtractor::new(self.oracle)
                    .with_config(timing.extractor.clone());
                let secret = extractor
                    .extract(&target, &timing.field, &timing.charset)
                    .await?;
                Ok(ChallengeOutcome::Secret(secret))
            }
            Challenge::BroadcastListen => {
                let udp = &self.config.udp;
                let filter = PacketFilter::from_source_port(udp.reply_port, udp.reply_port);
                match listen(&filter, udp.listen_deadline).await? {
                    ListenOutcome::Match(datagram) => {
                        Ok(ChallengeOutcome::Secret(datagram.text()))
                    }
                    ListenOutcome::Timeout => Ok(ChallengeOutcome::NoResponse),
                }
            }
            Challenge::TriggerProbe => {
                let udp = &self.config.udp;
                let target = SocketAddr::new(udp.device_addr, udp.reply_port);
                match probe(target, udp.trigger_payload.as_bytes(), udp.probe_deadline).await? {
                    ProbeOutcome::Reply(datagram) => {
                        Ok(ChallengeOutcome::Secret(datagram.text()))
                    }
                    ProbeOutcome::NoResponse => Ok(ChallengeOutcome::NoResponse),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use url::Url;

    use crate::probes::core::Observation;

    /// Answers GETs with a canned JSON body and times submissions by
    /// matched prefix length against a modeled secret.
    struct StubOracle {
        json_body: &'static [u8],
        secret: &'static str,
    }

    #[async_trait]
    impl Oracle for StubOracle {
        async fn submit(
            &self,
            _target: &Url,
            _field: &str,
            value: &str,
        ) -> Result<Observation, OracleError> {
            let matched = value
                .chars()
                .zip(self.secret.chars())
                .take_while(|(a, b)| a == b)
                .count() as u64;
            Ok(Observation {
                elapsed: Duration::from_millis(100 * matched),
                payload: Bytes::new(),
            })
        }

        async fn fetch(&self, _target: &Url) -> Result<Observation, OracleError> {
            Ok(Observation {
                elapsed: Duration::from_millis(7),
                payload: Bytes::from_static(self.json_body),
            })
        }
    }

    fn test_config() -> ProberConfig {
        let mut config = ProberConfig::default();
        config.timing.charset =
            crate::probes::core::Charset::new("CF}".chars(), '}').unwrap();
        config
    }

    #[tokio::test]
    async fn flag_fetch_reads_the_named_json_field() {
        let oracle = StubOracle {
            json_body: br#"{"flag":"CTF{led_on}"}"#,
            secret: "",
        };
        let config = test_config();
        let runner = ChallengeRunner::new(&oracle, &config);

        let outcome = runner
            .run(&Challenge::FlagFetch {
                path: "api/led/on".into(),
                field: "flag".into(),
            })
            .await
            .unwrap();

        match outcome {
            ChallengeOutcome::Secret(secret) => assert_eq!(secret, "CTF{led_on}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn flag_fetch_reports_missing_field() {
        let oracle = StubOracle {
            json_body: br#"{"status":"ok"}"#,
            secret: "",
        };
        let config = test_config();
        let runner = ChallengeRunner::new(&oracle, &config);

        let err = runner
            .run(&Challenge::FlagFetch {
                path: "api/clients".into(),
                field: "flag".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChallengeError::MissingField(field) if field == "flag"));
    }

    #[tokio::test]
    async fn timing_attack_runs_through_the_extractor() {
        let oracle = StubOracle {
            json_body: b"{}",
            secret: "CF}",
        };
        let config = test_config();
        let runner = ChallengeRunner::new(&oracle, &config);

        let outcome = runner.run(&Challenge::TimingAttack).await.unwrap();
        match outcome {
            ChallengeOutcome::Secret(secret) => assert_eq!(secret, "CF}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_all_continues_past_a_failed_challenge() {
        let oracle = StubOracle {
            json_body: br#"{"flag":"CTF{second}"}"#,
            secret: "",
        };
        let config = test_config();
        let runner = ChallengeRunner::new(&oracle, &config);

        let challenges = vec![
            Challenge::FlagFetch {
                path: "api/first".into(),
                field: "missing".into(),
            },
            Challenge::FlagFetch {
                path: "api/second".into(),
                field: "flag".into(),
            },
        ];
        let reports = runner.run_all(&challenges).await;

        assert_eq!(reports.len(), 2);
        assert!(matches!(reports[0].outcome, ChallengeOutcome::Failed(_)));
        assert!(
            matches!(&reports[1].outcome, ChallengeOutcome::Secret(secret) if secret == "CTF{second}"),
        );
    }
}

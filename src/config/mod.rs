//! Prober configuration.
//!
//! One config struct with a builder plus a JSON overlay for loading
//! settings from a file. Defaults mirror the stock device's published
//! contract so a bare `ProberConfig::default()` can drive it, but nothing
//! about the device (address, endpoint paths, trigger payload, ports) is
//! hardcoded anywhere else in the crate.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::probes::core::{Charset, CharsetError, Deadline};
use crate::probes::timing::ExtractorConfig;

const DEFAULT_BASE_URL: &str = "http://192.168.4.1/";
const DEFAULT_TIMING_PATH: &str = "timingAttack";
const DEFAULT_TIMING_FIELD: &str = "input";
const DEFAULT_TRIGGER_PAYLOAD: &str = "pleaseSendFlag";
const DEFAULT_REPLY_PORT: u16 = 1337;
const DEFAULT_SENTINEL: char = '}';

// Flag-prefix characters first so early rounds converge quickly; the
// closing brace doubles as the sentinel.
const DEFAULT_ALPHABET: &str =
    "CTF{}ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_";

/// Candidate alphabet used by the stock device.
pub static DEFAULT_CHARSET: Lazy<Charset> = Lazy::new(|| {
    Charset::new(DEFAULT_ALPHABET.chars(), DEFAULT_SENTINEL)
        .expect("default charset is well-formed")
});

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid charset: {0}")]
    Charset(#[from] CharsetError),
}

/// Settings for the timing side-channel endpoint.
#[derive(Debug, Clone)]
pub struct TimingChallengeConfig {
    /// Path of the timing oracle, relative to the base URL.
    pub path: String,
    /// Form field name the oracle reads candidates from.
    pub field: String,
    pub charset: Charset,
    pub extractor: ExtractorConfig,
}

impl Default for TimingChallengeConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_TIMING_PATH.into(),
            field: DEFAULT_TIMING_FIELD.into(),
            charset: DEFAULT_CHARSET.clone(),
            extractor: ExtractorConfig::default(),
        }
    }
}

/// Settings for the device's UDP reply contract.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    pub device_addr: IpAddr,
    /// Port the device broadcasts and replies from.
    pub reply_port: u16,
    /// Trigger payload the device answers to. Protocol detail fixed by the
    /// device, so it is configuration, not code.
    pub trigger_payload: String,
    pub listen_deadline: Deadline,
    pub probe_deadline: Deadline,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            device_addr: IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1)),
            reply_port: DEFAULT_REPLY_PORT,
            trigger_payload: DEFAULT_TRIGGER_PAYLOAD.into(),
            listen_deadline: Deadline::DEFAULT,
            probe_deadline: Deadline::new(Duration::from_secs(5)),
        }
    }
}

/// Top-level prober settings.
#[derive(Debug, Clone)]
pub struct ProberConfig {
    pub base_url: Url,
    /// Hard timeout for a single oracle round trip.
    pub request_timeout: Duration,
    pub timing: TimingChallengeConfig,
    pub udp: UdpConfig,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is well-formed"),
            request_timeout: Duration::from_secs(10),
            timing: TimingChallengeConfig::default(),
            udp: UdpConfig::default(),
        }
    }
}

impl ProberConfig {
    pub fn builder() -> ProberConfigBuilder {
        ProberConfigBuilder::new()
    }

    /// Load settings from a JSON document; absent fields keep defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let overlay: ConfigFile = serde_json::from_str(text)?;
        let mut config = Self::default();

        if let Some(base_url) = overlay.base_url {
            config.base_url = Url::parse(&base_url)?;
        }
        if let Some(ms) = overlay.request_timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(path) = overlay.timing_path {
            config.timing.path = path;
        }
        if let Some(field) = overlay.timing_field {
            config.timing.field = field;
        }
        if overlay.charset.is_some() || overlay.sentinel.is_some() {
            let alphabet = overlay.charset.as_deref().unwrap_or(DEFAULT_ALPHABET);
            let sentinel = overlay.sentinel.unwrap_or(DEFAULT_SENTINEL);
            config.timing.charset = Charset::new(alphabet.chars(), sentinel)?;
        }
        if let Some(samples) = overlay.samples_per_candidate {
            config.timing.extractor.samples_per_candidate = samples;
        }
        if let Some(ms) = overlay.noise_margin_ms {
            config.timing.extractor.noise_margin = Duration::from_millis(ms);
        }
        if let Some(rounds) = overlay.max_rounds {
            config.timing.extractor.max_rounds = rounds;
        }
        if let Some(addr) = overlay.device_addr {
            config.udp.device_addr = addr;
        }
        if let Some(port) = overlay.reply_port {
            config.udp.reply_port = port;
        }
        if let Some(payload) = overlay.trigger_payload {
            config.udp.trigger_payload = payload;
        }
        if let Some(ms) = overlay.listen_deadline_ms {
            config.udp.listen_deadline = Deadline::new(Duration::from_millis(ms));
        }
        if let Some(ms) = overlay.probe_deadline_ms {
            config.udp.probe_deadline = Deadline::new(Duration::from_millis(ms));
        }

        Ok(config)
    }
}

/// Wire-format overlay: every field optional, flat, in file-friendly units.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    timing_path: Option<String>,
    timing_field: Option<String>,
    charset: Option<String>,
    sentinel: Option<char>,
    samples_per_candidate: Option<usize>,
    noise_margin_ms: Option<u64>,
    max_rounds: Option<usize>,
    device_addr: Option<IpAddr>,
    reply_port: Option<u16>,
    trigger_payload: Option<String>,
    listen_deadline_ms: Option<u64>,
    probe_deadline_ms: Option<u64>,
}

/// Fluent builder for [`ProberConfig`].
pub struct ProberConfigBuilder {
    config: ProberConfig,
}

impl ProberConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ProberConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.config.base_url = base_url;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_timing_endpoint(
        mut self,
        path: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.config.timing.path = path.into();
        self.config.timing.field = field.into();
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.config.timing.charset = charset;
        self
    }

    pub fn with_extractor_config(mut self, extractor: ExtractorConfig) -> Self {
        self.config.timing.extractor = extractor;
        self
    }

    pub fn with_device_addr(mut self, addr: IpAddr) -> Self {
        self.config.udp.device_addr = addr;
        self
    }

    pub fn with_reply_port(mut self, port: u16) -> Self {
        self.config.udp.reply_port = port;
        self
    }

    pub fn with_trigger_payload(mut self, payload: impl Into<String>) -> Self {
        self.config.udp.trigger_payload = payload.into();
        self
    }

    pub fn with_listen_deadline(mut self, deadline: Deadline) -> Self {
        self.config.udp.listen_deadline = deadline;
        self
    }

    pub fn with_probe_deadline(mut self, deadline: Deadline) -> Self {
        self.config.udp.probe_deadline = deadline;
        self
    }

    pub fn build(self) -> ProberConfig {
        self.config
    }
}

impl Default for ProberConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_device_contract() {
        let config = ProberConfig::default();
        assert_eq!(config.base_url.as_str(), "http://192.168.4.1/");
        assert_eq!(config.timing.path, "timingAttack");
        assert_eq!(config.timing.field, "input");
        assert_eq!(config.udp.reply_port, 1337);
        assert_eq!(config.udp.trigger_payload, "pleaseSendFlag");
        assert_eq!(config.timing.charset.sentinel(), '}');
    }

    #[test]
    fn json_overlay_overrides_selected_fields() {
        let config = ProberConfig::from_json(
            r#"{
                "base_url": "http://10.0.0.7/",
                "trigger_payload": "sendItOver",
                "probe_deadline_ms": 2500,
                "samples_per_candidate": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_str(), "http://10.0.0.7/");
        assert_eq!(config.udp.trigger_payload, "sendItOver");
        assert_eq!(
            config.udp.probe_deadline.duration(),
            Duration::from_millis(2500),
        );
        assert_eq!(config.timing.extractor.samples_per_candidate, 5);
        // Untouched fields keep their defaults.
        assert_eq!(config.udp.reply_port, 1337);
    }

    #[test]
    fn json_overlay_rejects_unknown_fields() {
        assert!(matches!(
            ProberConfig::from_json(r#"{"reply_prot": 1337}"#),
            Err(ConfigError::Parse(_)),
        ));
    }

    #[test]
    fn json_overlay_validates_custom_charset() {
        let err = ProberConfig::from_json(r#"{"charset": "ABC", "sentinel": "}"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Charset(_)));
    }

    #[test]
    fn builder_applies_overrides() {
        let config = ProberConfig::builder()
            .with_reply_port(4444)
            .with_trigger_payload("knockKnock")
            .with_probe_deadline(Deadline::new(Duration::from_secs(1)))
            .build();

        assert_eq!(config.udp.reply_port, 4444);
        assert_eq!(config.udp.trigger_payload, "knockKnock");
        assert_eq!(config.udp.probe_deadline.duration(), Duration::from_secs(1));
    }
}

//! Core data structures shared across the probe capabilities.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// One timed oracle exchange: wall-clock latency from request dispatch to
/// full body receipt, plus the decoded payload.
#[derive(Debug, Clone)]
pub struct Observation {
    pub elapsed: Duration,
    pub payload: Bytes,
}

impl Observation {
    /// Payload decoded as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Extract a named string field from a JSON payload, if present.
    pub fn json_field(&self, field: &str) -> Option<String> {
        serde_json::from_slice::<serde_json::Value>(&self.payload)
            .ok()?
            .get(field)?
            .as_str()
            .map(str::to_owned)
    }
}

/// Errors raised while building a [`Charset`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharsetError {
    #[error("charset is empty")]
    Empty,
    #[error("sentinel '{0}' is not part of the charset")]
    MissingSentinel(char),
}

/// Ordered candidate alphabet for one timing extraction run.
///
/// The sentinel marks secret completion and must be a member of the
/// alphabet; both are fixed for the lifetime of the run. Candidate order is
/// significant: it is the tie-break order when latencies compare equal.
#[derive(Debug, Clone)]
pub struct Charset {
    chars: Vec<char>,
    sentinel: char,
}

impl Charset {
    pub fn new(
        chars: impl IntoIterator<Item = char>,
        sentinel: char,
    ) -> Result<Self, CharsetError> {
        let chars: Vec<char> = chars.into_iter().collect();
        if chars.is_empty() {
            return Err(CharsetError::Empty);
        }
        if !chars.contains(&sentinel) {
            return Err(CharsetError::MissingSentinel(sentinel));
        }
        Ok(Self { chars, sentinel })
    }

    /// Candidates in their fixed evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn sentinel(&self) -> char {
        self.sentinel
    }
}

/// Upper bound on how long a blocking network wait may run.
///
/// Mandatory by construction: there is no unbounded variant, so a missing
/// deadline is a type error rather than a runtime hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Duration);

impl Deadline {
    /// Bounded default used when callers have no better number.
    pub const DEFAULT: Deadline = Deadline(Duration::from_secs(10));

    pub const fn new(bound: Duration) -> Self {
        Self(bound)
    }

    pub const fn duration(self) -> Duration {
        self.0
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Duration> for Deadline {
    fn from(bound: Duration) -> Self {
        Self(bound)
    }
}

/// Which inbound datagrams a passive listen should accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFilter {
    /// Local port the listener binds.
    pub port: u16,
    /// Remote source port a datagram must carry to match.
    pub source_port: u16,
    /// Optional remote address restriction.
    pub source_addr: Option<IpAddr>,
}

impl PacketFilter {
    pub fn from_source_port(port: u16, source_port: u16) -> Self {
        Self {
            port,
            source_port,
            source_addr: None,
        }
    }

    pub fn with_source_addr(mut self, addr: IpAddr) -> Self {
        self.source_addr = Some(addr);
        self
    }

    /// Evaluated once per received datagram.
    pub fn matches(&self, source: SocketAddr) -> bool {
        if source.port() != self.source_port {
            return false;
        }
        match self.source_addr {
            Some(addr) => source.ip() == addr,
            None => true,
        }
    }
}

/// One datagram captured by a listen or probe call.
#[derive(Debug, Clone)]
pub struct CapturedDatagram {
    pub source: SocketAddr,
    pub payload: Bytes,
}

impl CapturedDatagram {
    /// Payload decoded as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn charset_rejects_empty_alphabet() {
        assert_eq!(Charset::new("".chars(), '}').unwrap_err(), CharsetError::Empty);
    }

    #[test]
    fn charset_rejects_foreign_sentinel() {
        assert_eq!(
            Charset::new("AB".chars(), '}').unwrap_err(),
            CharsetError::MissingSentinel('}'),
        );
    }

    #[test]
    fn charset_preserves_order() {
        let charset = Charset::new("CTF{}".chars(), '}').unwrap();
        assert_eq!(charset.iter().collect::<String>(), "CTF{}");
        assert_eq!(charset.sentinel(), '}');
    }

    #[test]
    fn filter_matches_on_source_port() {
        let filter = PacketFilter::from_source_port(1337, 1337);
        let matching = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1)), 1337);
        let wrong_port = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1)), 5000);
        assert!(filter.matches(matching));
        assert!(!filter.matches(wrong_port));
    }

    #[test]
    fn filter_restricts_source_addr_when_set() {
        let device = IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1));
        let filter = PacketFilter::from_source_port(1337, 1337).with_source_addr(device);
        let other = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 99)), 1337);
        assert!(filter.matches(SocketAddr::new(device, 1337)));
        assert!(!filter.matches(other));
    }

    #[test]
    fn observation_extracts_json_field() {
        let observation = Observation {
            elapsed: Duration::from_millis(12),
            payload: Bytes::from_static(br#"{"flag":"CTF{json}","status":"ok"}"#),
        };
        assert_eq!(observation.json_field("flag").as_deref(), Some("CTF{json}"));
        assert_eq!(observation.json_field("missing"), None);
    }

    #[test]
    fn observation_json_field_tolerates_non_json_payload() {
        let observation = Observation {
            elapsed: Duration::from_millis(1),
            payload: Bytes::from_static(b"<html>not json</html>"),
        };
        assert_eq!(observation.json_field("flag"), None);
    }
}

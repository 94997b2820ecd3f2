//! # flagprobe-rs
//!
//! Probes an embedded Wi-Fi device and recovers the secret tokens it hides
//! behind small network-level puzzles: a timing side-channel oracle, a
//! passive UDP broadcast, and a trigger-and-reply datagram exchange.
//!
//! The interesting part is the systems engineering, not the puzzles. The
//! crate models every network interaction as one of four narrow
//! capabilities — a timed oracle submission, a character-by-character timing
//! extractor built on top of it, a bounded passive packet listener, and a
//! one-shot UDP probe — and a thin runner that sequences them. Sockets are
//! scoped to single calls, every blocking wait carries a deadline, and
//! silent targets surface as normal outcomes instead of errors.
//!
//! ## Example
//!
//! ```no_run
//! use flagprobe_rs::DeviceProber;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prober = DeviceProber::new()?;
//!     for report in prober.run().await {
//!         println!("{:?}: {:?}", report.challenge, report.outcome);
//!     }
//!     Ok(())
//! }
//! ```

mod prober;

pub mod config;
pub mod probes;
pub mod runner;

pub use crate::prober::{DeviceProber, ProberError, ProberResult, default_challenges};

pub use crate::config::{
    ConfigError,
    DEFAULT_CHARSET,
    ProberConfig,
    ProberConfigBuilder,
    TimingChallengeConfig,
    UdpConfig,
};

pub use crate::probes::core::{
    CapturedDatagram,
    Charset,
    CharsetError,
    Deadline,
    Observation,
    Oracle,
    OracleError,
    PacketFilter,
    ReqwestOracle,
};

pub use crate::probes::timing::{ExtractError, ExtractorConfig, TimingExtractor};

pub use crate::probes::udp::{
    DatagramSource,
    ListenOutcome,
    ListenerError,
    ProbeError,
    ProbeOutcome,
    listen,
    listen_with,
    probe,
};

pub use crate::runner::{
    Challenge,
    ChallengeError,
    ChallengeOutcome,
    ChallengeReport,
    ChallengeRunner,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

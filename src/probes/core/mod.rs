//! Shared probe primitives: observation and filter types, the oracle
//! contract, and the reqwest-backed transport.

mod oracle;
mod reqwest_oracle;
mod types;

pub use oracle::{Oracle, OracleError};
pub use reqwest_oracle::ReqwestOracle;
pub use types::{
    CapturedDatagram, Charset, CharsetError, Deadline, Observation, PacketFilter,
};

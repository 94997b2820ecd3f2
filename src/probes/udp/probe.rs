//! Active UDP trigger probe.
//!
//! Sends exactly one datagram with a caller-supplied payload and waits,
//! bounded, for exactly one reply. A silent target is a normal outcome,
//! reported as `NoResponse` rather than an error.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::probes::core::{CapturedDatagram, Deadline};

use super::MAX_DATAGRAM;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),
}

/// Outcome of one trigger exchange.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The reply datagram elicited by the trigger.
    Reply(CapturedDatagram),
    /// The deadline expired with no reply. Normal, non-fatal.
    NoResponse,
}

/// Send `payload` to `target` once and wait for a single reply. The socket
/// is bound to an ephemeral port and scoped to this call; it is released on
/// every exit path.
pub async fn probe(
    target: SocketAddr,
    payload: &[u8],
    deadline: Deadline,
) -> Result<ProbeOutcome, ProbeError> {
    let bind_addr: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.send_to(payload, target).await?;

    let mut buf = [0u8; MAX_DATAGRAM];
    match timeout(deadline.duration(), socket.recv_from(&mut buf)).await {
        Ok(Ok((len, source))) => Ok(ProbeOutcome::Reply(CapturedDatagram {
            source,
            payload: Bytes::copy_from_slice(&buf[..len]),
        })),
        Ok(Err(err)) => Err(ProbeError::Socket(err)),
        Err(_) => Ok(ProbeOutcome::NoResponse),
    }
}

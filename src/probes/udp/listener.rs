//! Passive broadcast listener.
//!
//! Waits on a bound UDP port for the first datagram matching a caller
//! filter. The deadline is mandatory: an unbounded passive listen would make
//! both cancellation and socket release non-deterministic. Matching is
//! evaluated per datagram; non-matching traffic is discarded and the wait
//! continues until the deadline. The first match returns immediately with no
//! further background listening.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::probes::core::{CapturedDatagram, Deadline, PacketFilter};

use super::MAX_DATAGRAM;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),
}

/// Outcome of one bounded listen call.
#[derive(Debug)]
pub enum ListenOutcome {
    /// The first datagram that satisfied the filter.
    Match(CapturedDatagram),
    /// The deadline expired with no matching traffic. Normal, non-fatal.
    Timeout,
}

/// Source of inbound datagrams, abstracted so tests can inject scripted
/// traffic and observe release through a drop hook.
#[async_trait]
pub trait DatagramSource: Send {
    async fn recv(&mut self) -> io::Result<(SocketAddr, Bytes)>;
}

struct BoundSocket(UdpSocket);

#[async_trait]
impl DatagramSource for BoundSocket {
    async fn recv(&mut self) -> io::Result<(SocketAddr, Bytes)> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (len, source) = self.0.recv_from(&mut buf).await?;
        Ok((source, Bytes::copy_from_slice(&buf[..len])))
    }
}

/// Listen on `filter.port` until a matching datagram arrives or the deadline
/// expires. The socket is acquired before the wait begins and lives only for
/// the duration of this call.
pub async fn listen(
    filter: &PacketFilter,
    deadline: Deadline,
) -> Result<ListenOutcome, ListenerError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, filter.port)).await?;
    listen_with(BoundSocket(socket), filter, deadline).await
}

/// Filter loop shared by the real socket path and injected test sources.
/// Takes the source by value so it is released on every exit path.
pub async fn listen_with<S: DatagramSource>(
    mut source: S,
    filter: &PacketFilter,
    deadline: Deadline,
) -> Result<ListenOutcome, ListenerError> {
    let expires = Instant::now() + deadline.duration();
    loop {
        let remaining = expires.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(ListenOutcome::Timeout);
        }
        match timeout(remaining, source.recv()).await {
            Ok(Ok((from, payload))) => {
                if filter.matches(from) {
                    return Ok(ListenOutcome::Match(CapturedDatagram {
                        source: from,
                        payload,
                    }));
                }
                log::debug!("discarding non-matching datagram from {from}");
            }
            Ok(Err(err)) => return Err(ListenerError::Socket(err)),
            Err(_) => return Ok(ListenOutcome::Timeout),
        }
    }
}

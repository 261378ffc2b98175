//! Datagram channel abstraction over UDP.
//!
//! The sender engine talks to the network through [`DatagramChannel`]: a
//! best-effort send plus a non-blocking poll that yields at most one datagram
//! per call.  The poll must not block so a single loop can also service
//! window filling and the retransmit timer.
//!
//! [`UdpChannel`] is the real implementation, a thin wrapper around a
//! connected `tokio::net::UdpSocket` that speaks [`Datagram`] instead of raw
//! bytes.  Tests substitute an in-memory channel.

use thiserror::Error;
use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::datagram::Datagram;

/// Maximum UDP payload size (theoretical limit; in practice kept much smaller).
const MAX_DATAGRAM: usize = 65_535;

/// Errors that can arise from channel operations.
///
/// Only genuine I/O failures surface here.  Datagrams that fail to decode are
/// a recoverable per-datagram condition and are silently dropped by
/// [`DatagramChannel::poll`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An unreliable, possibly-reordering datagram channel.
pub trait DatagramChannel {
    /// Best-effort send of one datagram.  The channel may silently drop it;
    /// there is no delivery guarantee beyond success of the local call.
    fn send(&mut self, datagram: &Datagram) -> Result<(), TransportError>;

    /// Non-blocking poll for one inbound datagram.
    ///
    /// Returns `Ok(None)` when nothing is pending or the pending bytes did
    /// not decode to a valid datagram (corruption is dropped here).
    fn poll(&mut self) -> Result<Option<Datagram>, TransportError>;
}

/// A datagram-speaking UDP socket connected to one remote peer.
#[derive(Debug)]
pub struct UdpChannel {
    socket: UdpSocket,
}

impl UdpChannel {
    /// Bind an ephemeral local port and connect it to `remote`.
    ///
    /// Connecting fixes the destination for [`send`](DatagramChannel::send)
    /// and filters inbound traffic to the peer's address.
    pub async fn connect<A: ToSocketAddrs>(remote: A) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(remote).await?;
        Ok(Self { socket })
    }
}

impl DatagramChannel for UdpChannel {
    fn send(&mut self, datagram: &Datagram) -> Result<(), TransportError> {
        match self.socket.try_send(&datagram.encode()) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // Best-effort contract: treat local backpressure as a drop.
                log::trace!("socket not ready; datagram dropped locally");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn poll(&mut self) -> Result<Option<Datagram>, TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match self.socket.try_recv(&mut buf) {
            Ok(n) => match Datagram::decode(&buf[..n]) {
                Ok(dg) => Ok(Some(dg)),
                Err(e) => {
                    log::warn!("discarding undecodable datagram ({n} bytes): {e}");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

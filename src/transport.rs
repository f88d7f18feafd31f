//! The datagram transport boundary (spec §1: "datagram codec and wire
//! framing" plus the UDP socket itself are external collaborators; this
//! trait is the seam the core consumes). A real deployment supplies
//! [`UdpTransport`], built from the `(peer -> socket address)` table the
//! out-of-scope handshake produces (spec §6). Tests and the demo binary
//! supply an in-memory simulated transport instead (see [`crate::sim`]).

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::error::LockstepError;
use crate::types::HostId;

/// The only capability the Receiver and Transmitter need from the network:
/// send one datagram to a known peer, and receive the next one from
/// whoever it came from.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Sends `bytes` to `peer`. Fatal (spec §7) only if the transport
    /// itself is gone; an unreachable peer on an unreliable datagram
    /// transport is indistinguishable from silent packet loss and must not
    /// be treated as an error here.
    async fn send_to(&self, peer: HostId, bytes: &[u8]) -> Result<(), LockstepError>;

    /// Blocks until the next datagram arrives, returning the sender's
    /// enrolled `HostId` and the raw bytes.
    async fn recv(&self) -> Result<(HostId, Vec<u8>), LockstepError>;
}

/// A real UDP-backed transport. The `(HostId -> SocketAddr)` table is fixed
/// for the run (spec §3 Lifecycle) and supplied by the handshake.
pub struct UdpTransport {
    socket: UdpSocket,
    peer_addrs: HashMap<HostId, SocketAddr>,
    addr_to_peer: HashMap<SocketAddr, HostId>,
}

impl UdpTransport {
    /// Binds `local_addr` and wires up the peer address table produced by
    /// the handshake (spec §6).
    pub async fn bind(
        local_addr: SocketAddr,
        peer_addrs: HashMap<HostId, SocketAddr>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(local_addr).await?;
        let addr_to_peer = peer_addrs.iter().map(|(&id, &addr)| (addr, id)).collect();
        Ok(Self {
            socket,
            peer_addrs,
            addr_to_peer,
        })
    }
}

/// Datagrams larger than this are rejected by the OS long before reaching
/// here on any real network path; used only to size the receive buffer.
const MAX_DATAGRAM_SIZE: usize = 65_507;

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&self, peer: HostId, bytes: &[u8]) -> Result<(), LockstepError> {
        let addr = self
            .peer_addrs
            .get(&peer)
            .ok_or(LockstepError::UnknownSender(peer))?;
        self.socket
            .send_to(bytes, addr)
            .await
            .map_err(LockstepError::TransportClosed)?;
        Ok(())
    }

    async fn recv(&self) -> Result<(HostId, Vec<u8>), LockstepError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (n, addr) = self
                .socket
                .recv_from(&mut buf)
                .await
                .map_err(LockstepError::TransportClosed)?;

            match self.addr_to_peer.get(&addr) {
                Some(&peer) => return Ok((peer, buf[..n].to_vec())),
                None => {
                    // Unenrolled sender: protocol misuse, not fatal (spec
                    // §7). Keep waiting for the next datagram instead of
                    // surfacing an error for it.
                    tracing::debug!(%addr, "dropping datagram from unenrolled address");
                }
            }
        }
    }
}

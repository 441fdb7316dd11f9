//! Lossy UDP transport.
//!
//! [`Transport`] is a thin wrapper around `tokio::net::UdpSocket` bound to a
//! single peer.  Outbound data datagrams first pass through a
//! [`LossModel`]; a dropped datagram never reaches the wire.  All protocol
//! logic lives elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::ArqError;
use crate::simulator::LossModel;

/// Receive buffer size.  ACKs are 4 bytes; anything larger is discarded by
/// the caller anyway.
const RECV_BUF: usize = 1024;

/// What happened to one outbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the OS.
    Sent,
    /// Swallowed by the loss model.
    Dropped,
}

/// An async, peer-bound datagram transport with loss injection.
///
/// All methods are `&self` so the transport can be shared across tasks.
pub struct Transport {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    peer: SocketAddr,
    inner: UdpSocket,
    loss: Mutex<Box<dyn LossModel>>,
}

impl Transport {
    /// Bind a new socket to `local_addr`, sending to `peer`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(
        local_addr: SocketAddr,
        peer: SocketAddr,
        loss: Box<dyn LossModel>,
    ) -> Result<Self, ArqError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            peer,
            inner,
            loss: Mutex::new(loss),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send the data datagram `bytes` carrying sequence number `seq`, unless
    /// the loss model drops it.
    pub async fn send(&self, seq: u32, bytes: &[u8]) -> io::Result<SendOutcome> {
        let drop_it = self
            .loss
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .should_drop(seq);
        if drop_it {
            return Ok(SendOutcome::Dropped);
        }
        self.inner.send_to(bytes, self.peer).await?;
        Ok(SendOutcome::Sent)
    }

    /// Wait up to `poll` for the next inbound datagram.
    ///
    /// Returns `Ok(None)` when the poll interval elapses with nothing to read.
    /// The source address is not checked: a receiver bound to a wildcard
    /// address answers from whichever interface the data arrived on.
    pub async fn recv(&self, poll: Duration) -> io::Result<Option<Vec<u8>>> {
        let mut buf = [0u8; RECV_BUF];
        match tokio::time::timeout(poll, self.inner.recv_from(&mut buf)).await {
            Err(_elapsed) => Ok(None),
            Ok(Err(e)) => Err(e),
            Ok(Ok((n, from))) => {
                log::trace!("[gbn] {n}-byte datagram from {from}");
                Ok(Some(buf[..n].to_vec()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{DropList, NoLoss};

    async fn peer_socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.expect("bind peer")
    }

    async fn transport_to(peer: SocketAddr, loss: Box<dyn LossModel>) -> Transport {
        Transport::bind("127.0.0.1:0".parse().unwrap(), peer, loss)
            .await
            .expect("bind transport")
    }

    #[tokio::test]
    async fn send_reaches_peer() {
        let peer = peer_socket().await;
        let t = transport_to(peer.local_addr().unwrap(), Box::new(NoLoss)).await;

        assert_eq!(t.send(0, b"abcd").await.unwrap(), SendOutcome::Sent);

        let mut buf = [0u8; 16];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");
        assert_eq!(from, t.local_addr);
    }

    #[tokio::test]
    async fn dropped_datagram_never_hits_the_wire() {
        let peer = peer_socket().await;
        let t = transport_to(peer.local_addr().unwrap(), Box::new(DropList::new([0]))).await;

        assert_eq!(t.send(0, b"lost").await.unwrap(), SendOutcome::Dropped);
        assert_eq!(t.send(1, b"kept").await.unwrap(), SendOutcome::Sent);

        let mut buf = [0u8; 16];
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"kept");
    }

    #[tokio::test]
    async fn recv_times_out_when_idle() {
        let peer = peer_socket().await;
        let t = transport_to(peer.local_addr().unwrap(), Box::new(NoLoss)).await;
        let got = t.recv(Duration::from_millis(20)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn recv_returns_peer_datagram() {
        let peer = peer_socket().await;
        let t = transport_to(peer.local_addr().unwrap(), Box::new(NoLoss)).await;
        peer.send_to(&[0, 0, 0, 9], t.local_addr).await.unwrap();
        let got = t.recv(Duration::from_secs(1)).await.unwrap();
        assert_eq!(got.as_deref(), Some(&[0u8, 0, 0, 9][..]));
    }

    #[tokio::test]
    async fn recv_accepts_reply_from_other_address() {
        let peer = peer_socket().await;
        let other = peer_socket().await;
        let t = transport_to(peer.local_addr().unwrap(), Box::new(NoLoss)).await;

        other.send_to(&[0, 0, 0, 1], t.local_addr).await.unwrap();
        let got = t.recv(Duration::from_secs(1)).await.unwrap();
        assert_eq!(got.as_deref(), Some(&[0u8, 0, 0, 1][..]));
    }
}

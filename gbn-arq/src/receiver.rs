//! Go-Back-N receive side: a cumulative-ACK peer for the sender.
//!
//! [`GbnReceiver`] implements the receiver half of the protocol:
//!
//! - Only the **expected** sequence number is accepted.
//! - Out-of-order and duplicate packets are **discarded** without buffering.
//! - Every data packet, accepted or not, is answered with a cumulative ACK
//!   for the highest in-order sequence number received so far.  Before
//!   packet 0 arrives there is nothing to acknowledge and no ACK is sent.
//!
//! [`ReceiverPeer`] runs that state machine on a UDP socket.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::packet;

const MAX_DATAGRAM: usize = 65_535;

// ---------------------------------------------------------------------------
// GbnReceiver
// ---------------------------------------------------------------------------

/// Go-Back-N receive-side state.
#[derive(Debug, Default)]
pub struct GbnReceiver {
    /// Next sequence number that will be accepted.
    expected: u32,
    /// In-order payloads delivered so far.
    delivered: Vec<Vec<u8>>,
    /// Packets thrown away as out-of-order or duplicate.
    discarded: u32,
}

impl GbnReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one data packet and return the ACK to send back, if any.
    pub fn on_packet(&mut self, seq: u32, payload: &[u8]) -> Option<u32> {
        if seq == self.expected {
            self.delivered.push(payload.to_vec());
            self.expected += 1;
        } else {
            self.discarded += 1;
        }
        self.ack_number()
    }

    /// Highest in-order sequence number received, `None` before packet 0.
    pub fn ack_number(&self) -> Option<u32> {
        self.expected.checked_sub(1)
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    pub fn delivered(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    pub fn discarded(&self) -> u32 {
        self.discarded
    }
}

// ---------------------------------------------------------------------------
// ReceiverPeer
// ---------------------------------------------------------------------------

/// A [`GbnReceiver`] bound to a UDP socket.
pub struct ReceiverPeer {
    socket: UdpSocket,
    state: GbnReceiver,
}

impl ReceiverPeer {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(addr).await?,
            state: GbnReceiver::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answer data packets until `limit` packets have been delivered in
    /// order, or `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Returns the final receive state.
    pub async fn serve(
        mut self,
        limit: Option<u32>,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<GbnReceiver> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        while limit.map_or(true, |n| self.state.expected() < n) && !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                result = self.socket.recv_from(&mut buf) => {
                    let (n, from) = result?;
                    self.handle_datagram(&buf[..n], from).await;
                }
            }
        }
        log::info!(
            "[gbn:rx] delivered {} packet(s), discarded {}",
            self.state.delivered().len(),
            self.state.discarded()
        );
        Ok(self.state)
    }

    async fn handle_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        let pkt = match packet::decode_data(datagram) {
            Ok(pkt) => pkt,
            Err(e) => {
                log::debug!("[gbn:rx] discarding datagram from {from}: {e}");
                return;
            }
        };
        let accepted = pkt.seq == self.state.expected();
        let Some(ack) = self.state.on_packet(pkt.seq, &pkt.payload) else {
            log::debug!("[gbn:rx] ← DATA seq={} before seq 0; no ACK", pkt.seq);
            return;
        };
        log::debug!(
            "[gbn:rx] ← DATA seq={} accepted={accepted}; → ACK {ack}",
            pkt.seq
        );
        if let Err(e) = self.socket.send_to(&packet::encode_ack(ack), from).await {
            log::warn!("[gbn:rx] sending ACK {ack} failed: {e}");
        }
    }
}

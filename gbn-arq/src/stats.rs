//! Per-session counters.
//!
//! Updated only under the sender's window lock; external code sees copies
//! via [`crate::sender::Sender::snapshot`].

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Packets the session was asked to deliver.
    pub total_packets: u32,
    /// First transmissions that reached the wire.
    pub packets_sent: u32,
    /// Transmissions (first or repeated) swallowed by the loss model.
    pub packets_lost: u32,
    /// Repeated transmissions that reached the wire.
    pub retransmissions: u32,
    /// Well-formed ACK datagrams received, stale ones included.
    pub acks_received: u32,
    /// Retransmission timer expiries.
    pub timeouts: u32,
    /// Packets confirmed by cumulative ACK (the final `base`).
    pub confirmed: u32,
}

impl SessionStats {
    /// Confirmed share of all packets, in percent.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_packets > 0)
            .then(|| f64::from(self.confirmed) / f64::from(self.total_packets) * 100.0)
    }

    /// Retransmissions relative to first transmissions, in percent.
    pub fn retransmission_rate(&self) -> Option<f64> {
        (self.packets_sent > 0)
            .then(|| f64::from(self.retransmissions) / f64::from(self.packets_sent) * 100.0)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "packets to send:     {}", self.total_packets)?;
        writeln!(f, "packets sent:        {}", self.packets_sent)?;
        writeln!(f, "packets confirmed:   {}", self.confirmed)?;
        writeln!(f, "packets lost (sim):  {}", self.packets_lost)?;
        writeln!(f, "ACKs received:       {}", self.acks_received)?;
        writeln!(f, "retransmissions:     {}", self.retransmissions)?;
        write!(f, "timeouts:            {}", self.timeouts)?;
        if let Some(rate) = self.success_rate() {
            write!(f, "\nsuccess rate:        {rate:.1}%")?;
        }
        if let Some(rate) = self.retransmission_rate() {
            write!(f, "\nretransmission rate: {rate:.1}%")?;
        }
        Ok(())
    }
}

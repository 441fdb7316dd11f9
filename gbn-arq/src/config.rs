//! Construction-time session parameters.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ArqError;

/// Everything a sender session needs to know up front.  Nothing here changes
/// once the session is running.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Receiver address.
    pub peer: SocketAddr,
    /// Local address to bind; port 0 lets the OS choose.
    pub bind: SocketAddr,
    /// Maximum number of packets in flight (N).
    pub window_size: u32,
    /// Retransmission timeout for the oldest unacknowledged packet.
    pub timeout: Duration,
    /// Probability in `[0.0, 1.0]` that an outbound data datagram is dropped.
    pub loss_rate: f64,
    /// Seed for the loss RNG; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Sequence numbers whose first transmission is dropped.  Overrides
    /// `loss_rate` when non-empty.
    pub drop_list: Vec<u32>,
    /// Packets to deliver, sequence numbers `0..total_packets`.
    pub total_packets: u32,
    /// Give up and report partial completion after this long.
    pub max_wait: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            peer: SocketAddr::from(([127, 0, 0, 1], 8080)),
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
            window_size: 4,
            timeout: Duration::from_secs(2),
            loss_rate: 0.0,
            seed: None,
            drop_list: Vec::new(),
            total_packets: 15,
            max_wait: Duration::from_secs(30),
        }
    }
}

impl SenderConfig {
    /// Reject parameter combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ArqError> {
        if self.window_size == 0 {
            return Err(ArqError::InvalidConfig("window size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(ArqError::InvalidConfig(format!(
                "loss rate {} outside [0.0, 1.0]",
                self.loss_rate
            )));
        }
        if self.timeout.is_zero() {
            return Err(ArqError::InvalidConfig("retransmission timeout must be positive".into()));
        }
        if self.max_wait.is_zero() {
            return Err(ArqError::InvalidConfig("maximum wait must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SenderConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let cfg = SenderConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ArqError::InvalidConfig(_))));
    }

    #[test]
    fn loss_rate_bounds() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let cfg = SenderConfig {
                loss_rate: bad,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "accepted loss rate {bad}");
        }
        for good in [0.0, 0.5, 1.0] {
            let cfg = SenderConfig {
                loss_rate: good,
                ..Default::default()
            };
            assert!(cfg.validate().is_ok(), "rejected loss rate {good}");
        }
    }

    #[test]
    fn zero_durations_rejected() {
        let cfg = SenderConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = SenderConfig {
            max_wait: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}

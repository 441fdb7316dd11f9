//! One complete sender session: setup, transfer, shutdown, report.
//!
//! ```ignore
//! let report = Session::start(&config).await?.run().await;
//! println!("{report}");
//! ```
//!
//! [`Session::run`] drives the transfer under the configured maximum wait.
//! Whatever the outcome, it then stops the sender (which cancels the
//! retransmission timer), waits for the ACK listener and timer handler to
//! exit, and releases the socket.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::SenderConfig;
use crate::error::ArqError;
use crate::sender::{Sender, Workers};
use crate::simulator;
use crate::state::SenderState;
use crate::stats::SessionStats;
use crate::transport::Transport;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every packet was acknowledged.
    Done,
    /// The maximum wait elapsed (or the session was stopped) first.
    Partial { confirmed: u32, total: u32 },
}

/// Final result of [`Session::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: Outcome,
    pub stats: SessionStats,
}

impl SessionReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Done
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Done => writeln!(f, "all packets confirmed")?,
            Outcome::Partial { confirmed, total } => {
                writeln!(f, "partially completed: {confirmed}/{total} packets")?
            }
        }
        write!(f, "{}", self.stats)
    }
}

/// A running sender plus its background tasks.
pub struct Session {
    sender: Arc<Sender>,
    workers: Workers,
    config: SenderConfig,
}

impl Session {
    /// Validate `config`, bind the socket and start the sender's background
    /// tasks.  No data is sent until [`run`](Self::run).
    pub async fn start(config: &SenderConfig) -> Result<Self, ArqError> {
        config.validate()?;
        let loss = simulator::from_settings(config.loss_rate, config.seed, &config.drop_list);
        let transport = Transport::bind(config.bind, config.peer, loss).await?;
        log::info!(
            "[gbn] session {} -> {}: window={} timeout={:?} loss={:.1}% packets={}",
            transport.local_addr,
            transport.peer(),
            config.window_size,
            config.timeout,
            config.loss_rate * 100.0,
            config.total_packets
        );
        let (sender, workers) = Sender::start(
            transport,
            config.window_size,
            config.timeout,
            config.total_packets,
        );
        Ok(Self {
            sender,
            workers,
            config: config.clone(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.sender.local_addr()
    }

    /// Shared handle to the engine, e.g. to call [`Sender::stop`] from a
    /// signal handler or to take snapshots while the session runs.
    pub fn sender(&self) -> Arc<Sender> {
        Arc::clone(&self.sender)
    }

    /// Transfer every packet, then shut down and report.
    pub async fn run(self) -> SessionReport {
        let total = self.config.total_packets;
        {
            let drive = self.sender.drive();
            tokio::pin!(drive);
            if tokio::time::timeout(self.config.max_wait, &mut drive)
                .await
                .is_err()
            {
                log::warn!("[gbn] maximum wait of {:?} reached", self.config.max_wait);
                // Let an in-progress batch finish so its datagrams are counted.
                self.sender.stop();
                drive.await;
            }
        }

        let confirmed = self.sender.snapshot().base;
        let outcome = if confirmed >= total {
            log::info!("[gbn] all {total} packets confirmed");
            Outcome::Done
        } else {
            log::warn!("[gbn] partially completed: {confirmed}/{total} packets");
            Outcome::Partial { confirmed, total }
        };
        self.shutdown(outcome).await
    }

    async fn shutdown(self, outcome: Outcome) -> SessionReport {
        self.sender.stop();
        self.workers.join().await;
        self.sender.finish(match outcome {
            Outcome::Done => SenderState::Done,
            Outcome::Partial { .. } => SenderState::Partial,
        });
        let stats = self.sender.snapshot().stats;
        SessionReport { outcome, stats }
    }
}

/// Convenience wrapper: [`Session::start`] followed by [`Session::run`].
pub async fn run(config: &SenderConfig) -> Result<SessionReport, ArqError> {
    Ok(Session::start(config).await?.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::LossModel;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    /// Never drops, but counts every transmission attempt.
    struct CountAttempts(Arc<AtomicU32>);

    impl LossModel for CountAttempts {
        fn should_drop(&mut self, _seq: u32) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    #[test]
    fn report_display_done() {
        let report = SessionReport {
            outcome: Outcome::Done,
            stats: SessionStats {
                total_packets: 3,
                confirmed: 3,
                packets_sent: 3,
                ..Default::default()
            },
        };
        let text = report.to_string();
        assert!(text.starts_with("all packets confirmed"));
        assert!(text.contains("success rate:        100.0%"));
        assert!(report.is_complete());
    }

    #[test]
    fn report_display_partial() {
        let report = SessionReport {
            outcome: Outcome::Partial {
                confirmed: 2,
                total: 5,
            },
            stats: SessionStats::default(),
        };
        assert!(report.to_string().starts_with("partially completed: 2/5 packets"));
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn max_wait_books_every_datagram_that_went_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let attempts = Arc::new(AtomicU32::new(0));
        let config = SenderConfig {
            peer: silent.local_addr().unwrap(),
            bind: "127.0.0.1:0".parse().unwrap(),
            window_size: 64,
            total_packets: 64,
            timeout: Duration::from_millis(10),
            max_wait: Duration::from_millis(55),
            ..Default::default()
        };
        let transport = Transport::bind(
            config.bind,
            config.peer,
            Box::new(CountAttempts(Arc::clone(&attempts))),
        )
        .await
        .unwrap();
        let (sender, workers) =
            Sender::start(transport, config.window_size, config.timeout, config.total_packets);
        let session = Session {
            sender,
            workers,
            config,
        };

        let report = session.run().await;

        assert!(!report.is_complete());
        let s = report.stats;
        assert_eq!(s.packets_sent, 64);
        assert_eq!(
            s.packets_sent + s.retransmissions + s.packets_lost,
            attempts.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn invalid_config_fails_before_binding() {
        let cfg = SenderConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(matches!(run(&cfg).await, Err(ArqError::InvalidConfig(_))));
    }
}

//! Single-shot retransmission timer.
//!
//! Go-Back-N needs exactly one timer per sender, bound to the oldest
//! unacknowledged packet.  [`RetransmitTimer`] arms a `tokio::time::sleep`
//! task which, on expiry, posts its *generation* number to an mpsc channel.
//! The sender's expiry handler then calls [`RetransmitTimer::claim_expiry`]
//! under the window lock; an expiry whose generation is no longer armed
//! (cancelled or restarted in the meantime) is rejected, so a cancelled
//! timer can never trigger a retransmission.
//!
//! Operations mirror the textbook interface:
//! - [`start`](RetransmitTimer::start): no-op if already active.
//! - [`cancel`](RetransmitTimer::cancel): no-op if inactive.
//! - [`restart`](RetransmitTimer::restart): cancel, then start.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identifies one arming of the timer.
pub type Generation = u64;

struct Armed {
    generation: Generation,
    task: JoinHandle<()>,
}

/// The one retransmission timer of a sender.
///
/// Must be used from within a tokio runtime: arming spawns a task.
pub struct RetransmitTimer {
    interval: Duration,
    expired_tx: mpsc::UnboundedSender<Generation>,
    last_generation: Generation,
    armed: Option<Armed>,
}

impl RetransmitTimer {
    /// Create an inactive timer that reports expiries on `expired_tx`.
    pub fn new(interval: Duration, expired_tx: mpsc::UnboundedSender<Generation>) -> Self {
        Self {
            interval,
            expired_tx,
            last_generation: 0,
            armed: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.armed.is_some()
    }

    /// Arm the timer unless it is already running.
    pub fn start(&mut self) {
        if self.armed.is_some() {
            return;
        }
        self.last_generation += 1;
        let generation = self.last_generation;
        let interval = self.interval;
        let tx = self.expired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            // Receiver gone means the session is over.
            let _ = tx.send(generation);
        });
        log::trace!("[gbn] timer armed gen={generation} ({interval:?})");
        self.armed = Some(Armed { generation, task });
    }

    /// Disarm the timer if it is running.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
            log::trace!("[gbn] timer cancelled gen={}", armed.generation);
        }
    }

    pub fn restart(&mut self) {
        self.cancel();
        self.start();
    }

    /// Accept an expiry event.
    ///
    /// Returns `true` and disarms the timer only when `generation` is the
    /// arming that is currently active; stale events return `false`.
    pub fn claim_expiry(&mut self, generation: Generation) -> bool {
        let current = self
            .armed
            .as_ref()
            .is_some_and(|armed| armed.generation == generation);
        if current {
            self.armed = None;
        }
        current
    }
}

impl Drop for RetransmitTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

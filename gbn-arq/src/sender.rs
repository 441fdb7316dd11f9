//! Go-Back-N sender engine.
//!
//! # Architecture
//!
//! ```text
//!   drive() ────────┐                         ┌──── ack_listener task
//!   (production)    │    Mutex<Inner>          │     (Transport::recv)
//!                   ├──▶ ├── SendWindow ◀──────┤
//!                   │    ├── RetransmitTimer   │
//!   expiry_handler ─┘    ├── SessionStats      └──── on_ack()
//!   task (on_timeout)    └── SenderState
//! ```
//!
//! Three activities mutate the same window: the production loop, the ACK
//! listener and the timer-expiry handler.  Each of [`Sender::drive`]'s window
//! steps, [`Sender::on_ack`] and [`Sender::on_timeout`] runs its bookkeeping
//! as one critical section under the `inner` mutex.  Datagrams are never sent
//! while that lock is held: a critical section copies out the bytes to
//! transmit, the lock is released, the I/O happens, and the resulting counts
//! are booked in a second short critical section.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::packet::{self, DataPacket};
use crate::state::SenderState;
use crate::stats::SessionStats;
use crate::timer::{Generation, RetransmitTimer};
use crate::transport::{SendOutcome, Transport};
use crate::window::{AckOutcome, SendWindow};

/// Upper bound on how long any background loop blocks before re-checking the
/// running flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Whether a batch of datagrams is going out for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transmission {
    First,
    Repeat,
}

struct Inner {
    window: SendWindow,
    timer: RetransmitTimer,
    stats: SessionStats,
    state: SenderState,
}

/// Point-in-time copy of the sender's state, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub base: u32,
    pub next_seq: u32,
    pub window_size: u32,
    pub timer_active: bool,
    pub state: SenderState,
    pub stats: SessionStats,
    /// Window bound and pending-store invariants held when the copy was taken.
    pub consistent: bool,
}

impl Snapshot {
    pub fn in_flight(&self) -> u32 {
        self.next_seq - self.base
    }
}

/// Go-Back-N send side for one session of `total` packets.
pub struct Sender {
    inner: Mutex<Inner>,
    transport: Transport,
    total: u32,
    running: AtomicBool,
    /// Signalled whenever an ACK slides the window.
    slid: Notify,
}

/// Background tasks spawned by [`Sender::start`].
pub struct Workers {
    listener: JoinHandle<()>,
    expiry: JoinHandle<()>,
}

impl Workers {
    /// Wait for both tasks to observe the stop signal and exit.
    pub async fn join(self) {
        if let Err(e) = self.listener.await {
            log::warn!("[gbn] ACK listener ended abnormally: {e}");
        }
        if let Err(e) = self.expiry.await {
            log::warn!("[gbn] timer handler ended abnormally: {e}");
        }
    }
}

impl Sender {
    /// Build the engine around `transport` and spawn its ACK listener and
    /// timer-expiry handler.  Must be called inside a tokio runtime.
    pub fn start(
        transport: Transport,
        window_size: u32,
        timeout: Duration,
        total: u32,
    ) -> (Arc<Self>, Workers) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let sender = Arc::new(Self {
            inner: Mutex::new(Inner {
                window: SendWindow::new(window_size),
                timer: RetransmitTimer::new(timeout, expired_tx),
                stats: SessionStats {
                    total_packets: total,
                    ..SessionStats::default()
                },
                state: SenderState::Init,
            }),
            transport,
            total,
            running: AtomicBool::new(true),
            slid: Notify::new(),
        });
        let workers = Workers {
            listener: tokio::spawn(ack_listener(Arc::clone(&sender))),
            expiry: tokio::spawn(expiry_handler(Arc::clone(&sender), expired_rx)),
        };
        (sender, workers)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Production loop
    // -----------------------------------------------------------------------

    /// Send packets `0..total` through the window until every one of them is
    /// acknowledged or the sender is stopped.
    ///
    /// Each pass fills the window up to `min(base + size, total)` and then
    /// sleeps until an ACK slides it (or [`POLL_INTERVAL`] elapses).
    pub async fn drive(&self) {
        loop {
            let batch = {
                let mut inner = self.lock();
                if !self.is_running() {
                    return;
                }
                if inner.window.base() >= self.total {
                    inner.state = SenderState::Done;
                    return;
                }
                let mut batch = Vec::new();
                while let Some(seq) = inner.window.sendable(self.total) {
                    let bytes = DataPacket::synthetic(seq).encode();
                    inner.window.record_sent(bytes.clone());
                    batch.push((seq, bytes));
                }
                if inner.window.has_unacked() {
                    inner.timer.start();
                }
                debug_assert!(inner.window.is_consistent());
                inner.state = if batch.is_empty() {
                    SenderState::Waiting
                } else {
                    SenderState::Sending
                };
                batch
            };

            if batch.is_empty() {
                let _ = tokio::time::timeout(POLL_INTERVAL, self.slid.notified()).await;
            } else {
                self.transmit(batch, Transmission::First).await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Acknowledgments
    // -----------------------------------------------------------------------

    /// Apply a cumulative acknowledgment for `ack`.
    ///
    /// Slides the window, restarts the timer while packets remain outstanding
    /// (cancels it otherwise) and wakes the production loop.  Stale and
    /// out-of-range ACKs leave the state untouched.
    pub fn on_ack(&self, ack: u32) -> AckOutcome {
        let mut inner = self.lock();
        inner.stats.acks_received += 1;
        let old_base = inner.window.base();
        let outcome = inner.window.on_ack(ack);
        match outcome {
            AckOutcome::Advanced { acked } => {
                let base = inner.window.base();
                log::debug!("[gbn] ← ACK {ack}: base {old_base} -> {base} ({acked} confirmed)");
                if inner.window.has_unacked() && self.is_running() {
                    inner.timer.restart();
                } else {
                    inner.timer.cancel();
                }
                debug_assert!(inner.window.is_consistent());
                drop(inner);
                self.slid.notify_one();
            }
            AckOutcome::Stale => {
                log::debug!("[gbn] ← ACK {ack} stale (base={old_base})");
            }
            AckOutcome::Unsent => {
                log::warn!(
                    "[gbn] ← ACK {ack} for unsent data (next_seq={}); ignored",
                    inner.window.next_seq()
                );
            }
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Timeouts
    // -----------------------------------------------------------------------

    /// Retransmit the whole in-flight range `[base, next_seq)` from the
    /// stored bytes and re-arm the timer.  Does nothing once stopped.
    pub async fn on_timeout(&self) {
        self.retransmit(None).await;
    }

    /// Timer task fired for `generation`; ignored unless that arming is
    /// still the live one.
    async fn on_expiry(&self, generation: Generation) {
        self.retransmit(Some(generation)).await;
    }

    async fn retransmit(&self, generation: Option<Generation>) {
        let batch = {
            let mut inner = self.lock();
            if !self.is_running() {
                log::trace!("[gbn] timeout after stop ignored");
                return;
            }
            match generation {
                Some(generation) if !inner.timer.claim_expiry(generation) => {
                    log::trace!("[gbn] stale timer expiry gen={generation}");
                    return;
                }
                Some(_) => {}
                None => inner.timer.cancel(),
            }
            self.begin_retransmit(&mut inner)
        };
        self.transmit(batch, Transmission::Repeat).await;
    }

    fn begin_retransmit(&self, inner: &mut Inner) -> Vec<(u32, Vec<u8>)> {
        inner.stats.timeouts += 1;
        let batch = inner.window.retransmit_batch();
        if batch.is_empty() {
            return batch;
        }
        inner.state = SenderState::Retransmitting;
        log::info!(
            "[gbn] TIMEOUT, retransmitting {}..={}",
            inner.window.base(),
            inner.window.next_seq() - 1
        );
        if self.is_running() {
            inner.timer.start();
        }
        batch
    }

    // -----------------------------------------------------------------------
    // Shutdown / inspection
    // -----------------------------------------------------------------------

    /// Stop the session: the production loop returns, the timer is cancelled
    /// and the background tasks exit on their next poll.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.lock().timer.cancel();
        self.slid.notify_waiters();
    }

    /// Record the terminal state chosen by the session.
    pub(crate) fn finish(&self, state: SenderState) {
        self.lock().state = state;
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        let base = inner.window.base();
        Snapshot {
            base,
            next_seq: inner.window.next_seq(),
            window_size: inner.window.size(),
            timer_active: inner.timer.is_active(),
            state: inner.state,
            stats: SessionStats {
                confirmed: base,
                ..inner.stats
            },
            consistent: inner.window.is_consistent(),
        }
    }

    // -----------------------------------------------------------------------
    // I/O
    // -----------------------------------------------------------------------

    /// Put `batch` on the wire (outside the lock) and book the counts.
    ///
    /// A failed send is only logged: the bytes stay in the pending store and
    /// go out again on the next timeout.
    async fn transmit(&self, batch: Vec<(u32, Vec<u8>)>, kind: Transmission) {
        let mut sent = 0u32;
        let mut lost = 0u32;
        for (seq, bytes) in batch {
            match self.transport.send(seq, &bytes).await {
                Ok(SendOutcome::Sent) => {
                    sent += 1;
                    match kind {
                        Transmission::First => log::debug!("[gbn] → DATA seq={seq}"),
                        Transmission::Repeat => log::debug!("[gbn] → DATA seq={seq} (again)"),
                    }
                }
                Ok(SendOutcome::Dropped) => {
                    lost += 1;
                    log::info!("[gbn] packet #{seq} lost (simulated)");
                }
                Err(e) => log::warn!("[gbn] sending seq={seq} failed: {e}"),
            }
        }

        let mut inner = self.lock();
        match kind {
            Transmission::First => inner.stats.packets_sent += sent,
            Transmission::Repeat => inner.stats.retransmissions += sent,
        }
        inner.stats.packets_lost += lost;
        if matches!(
            inner.state,
            SenderState::Sending | SenderState::Retransmitting
        ) {
            inner.state = SenderState::Waiting;
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Receive acknowledgments until the sender stops.  Anything that is not a
/// well-formed 4-byte ACK is dropped.
async fn ack_listener(sender: Arc<Sender>) {
    while sender.is_running() {
        match sender.transport.recv(POLL_INTERVAL).await {
            Ok(Some(datagram)) => match packet::decode_ack(&datagram) {
                Ok(ack) => {
                    sender.on_ack(ack);
                }
                Err(e) => log::debug!("[gbn] discarding datagram: {e}"),
            },
            Ok(None) => {}
            Err(e) => {
                if sender.is_running() {
                    log::warn!("[gbn] ACK receive failed: {e}");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
    log::debug!("[gbn] ACK listener stopped");
}

/// Turn timer expiries into retransmissions until the sender stops.
async fn expiry_handler(sender: Arc<Sender>, mut expired: mpsc::UnboundedReceiver<Generation>) {
    while sender.is_running() {
        match tokio::time::timeout(POLL_INTERVAL, expired.recv()).await {
            Ok(Some(generation)) => sender.on_expiry(generation).await,
            Ok(None) => break,
            Err(_idle) => {}
        }
    }
    log::debug!("[gbn] timer handler stopped");
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

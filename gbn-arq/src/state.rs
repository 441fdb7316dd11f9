//! Sender finite-state machine types.
//!
//! Transitions are driven by [`crate::sender::Sender`]; this module only
//! names the states so they can be logged and inspected.
//!
//! ```text
//!  INIT ──drive──▶ SENDING ──window full / all sent──▶ WAITING
//!                     ▲                                 │  │
//!                     └────────────ACK slides───────────┘  │ timeout
//!                                                          ▼
//!                                   WAITING ◀──── RETRANSMITTING
//!
//!  base == total ──▶ DONE          max wait elapsed ──▶ PARTIAL
//! ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Session created, nothing sent yet.
    #[default]
    Init,
    /// Emitting new packets into the window.
    Sending,
    /// Window full (or every packet sent); waiting for ACKs with the timer armed.
    Waiting,
    /// Timer expired; resending the in-flight range.
    Retransmitting,
    /// Every packet acknowledged.
    Done,
    /// Gave up after the maximum wait with packets still unconfirmed.
    Partial,
}

impl SenderState {
    /// `true` for `Done` and `Partial`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Partial)
    }
}

impl std::fmt::Display for SenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Sending => "SENDING",
            Self::Waiting => "WAITING",
            Self::Retransmitting => "RETRANSMITTING",
            Self::Done => "DONE",
            Self::Partial => "PARTIAL",
        };
        f.write_str(name)
    }
}

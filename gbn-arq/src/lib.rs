//! `gbn-arq`: reliable delivery over UDP with a Go-Back-N sender.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────┐  data   ┌─────────────┐
//!  packets 0..N ──▶│    Sender    │────────▶│  Transport  │──▶ UDP ──▶ receiver
//!                  │ window+timer │         │ (loss model)│
//!  timer expiry ──▶│              │◀────────│             │◀── UDP ◀── cumulative ACKs
//!                  └──────────────┘  ACKs   └─────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    : wire format (serialise / deserialise)
//! - [`window`]    : sliding window plus pending-packet store
//! - [`timer`]     : the single retransmission timer
//! - [`sender`]    : send engine, ACK listener, timeout handling
//! - [`session`]   : session lifecycle, maximum wait, final report
//! - [`state`]     : sender finite-state-machine types
//! - [`stats`]     : per-session counters
//! - [`transport`] : UDP socket wrapper with outbound loss injection
//! - [`simulator`] : loss models
//! - [`receiver`]  : cumulative-ACK receiver peer
//! - [`config`]    : session parameters

pub mod config;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod simulator;
pub mod state;
pub mod stats;
pub mod timer;
pub mod transport;
pub mod window;

pub use config::SenderConfig;
pub use error::ArqError;
pub use session::{Outcome, Session, SessionReport};

//! Wire-format definitions for data packets and acknowledgments.
//!
//! No I/O happens here: this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! Data packet:
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Payload (UTF-8) ...                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Acknowledgment: exactly [`SEQ_LEN`] bytes holding the cumulative sequence
//! number.  A datagram of any other length is not an acknowledgment.

use thiserror::Error;

/// Byte length of the sequence-number prefix (and of a whole ACK).
pub const SEQ_LEN: usize = 4;

/// A data packet: sequence number plus opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub seq: u32,
    pub payload: Vec<u8>,
}

impl DataPacket {
    /// Build the packet for `seq` carrying the synthetic payload.
    pub fn synthetic(seq: u32) -> Self {
        Self {
            seq,
            payload: synthetic_payload(seq).into_bytes(),
        }
    }

    /// Serialise into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.seq, &self.payload)
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Datagram shorter than the sequence-number prefix.
    #[error("datagram of {0} bytes is too short for a sequence number")]
    TooShort(usize),
    /// Datagram length is not exactly [`SEQ_LEN`].
    #[error("datagram of {0} bytes is not an acknowledgment")]
    NotAnAck(usize),
}

/// Payload generated for sequence number `seq`.
pub fn synthetic_payload(seq: u32) -> String {
    format!("message {seq:03}")
}

/// Serialise a data packet: big-endian `seq` followed by `payload`.
pub fn encode(seq: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SEQ_LEN + payload.len());
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Parse a data packet.  Any datagram of at least [`SEQ_LEN`] bytes decodes.
pub fn decode_data(buf: &[u8]) -> Result<DataPacket, PacketError> {
    if buf.len() < SEQ_LEN {
        return Err(PacketError::TooShort(buf.len()));
    }
    let (prefix, payload) = buf.split_at(SEQ_LEN);
    Ok(DataPacket {
        seq: read_seq(prefix),
        payload: payload.to_vec(),
    })
}

/// Serialise a cumulative acknowledgment.
pub fn encode_ack(seq: u32) -> [u8; SEQ_LEN] {
    seq.to_be_bytes()
}

/// Parse a cumulative acknowledgment.
pub fn decode_ack(buf: &[u8]) -> Result<u32, PacketError> {
    if buf.len() != SEQ_LEN {
        return Err(PacketError::NotAnAck(buf.len()));
    }
    Ok(read_seq(buf))
}

fn read_seq(prefix: &[u8]) -> u32 {
    let mut raw = [0u8; SEQ_LEN];
    raw.copy_from_slice(&prefix[..SEQ_LEN]);
    u32::from_be_bytes(raw)
}

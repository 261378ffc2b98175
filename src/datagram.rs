//! Wire-format definitions for transfer datagrams.
//!
//! Every unit exchanged between sender and receiver is a [`Datagram`].  This
//! module is responsible for:
//! - Defining the on-wire binary layout (header fields, payload).
//! - Serialising a [`Datagram`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Datagram`], returning errors
//!   for malformed, truncated, or corrupted input.
//!
//! No I/O happens here.  This is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        Sequence Number        |     Acknowledgment Number     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Payload Length        |            Checksum           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 8 bytes.
//! seq(2) + ack(2) + payload_len(2) + checksum(2)
//!
//! There is no flags field: end of stream is signalled by a payload shorter
//! than [`MAX_PAYLOAD`], and the transfer ends with a zero-length marker
//! datagram.

use thiserror::Error;

/// Largest payload a single data datagram may carry.
///
/// A tunable constant, not a protocol invariant; both ends must agree on it
/// because a shorter payload marks the final data-bearing datagram.
pub const MAX_PAYLOAD: usize = 255;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 8;

// Byte offsets of each field within the serialised header.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 2;
const OFF_PAYLOAD_LEN: usize = 4;
const OFF_CHECKSUM: usize = 6;

/// Fixed-size datagram header.
///
/// Fields are in host byte order; [`Datagram::encode`] converts to big-endian
/// on the wire and [`Datagram::decode`] converts back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Sequence number of this datagram (sender → receiver direction).
    pub seq: u16,
    /// Cumulative acknowledgement number (receiver → sender direction):
    /// every datagram with sequence number at or below this value has been
    /// received.
    pub ack: u16,
    /// Length of the payload in bytes.
    ///
    /// On encode this is computed from the actual payload length.
    /// On decode this is validated against the remaining buffer bytes.
    pub payload_len: u16,
    /// Internet checksum (RFC 1071) over the entire serialised datagram.
    ///
    /// On encode this is computed and written last.
    /// On decode this is verified before the datagram is returned.
    pub checksum: u16,
}

/// A complete transfer datagram: header + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Datagram {
    /// Build a data-bearing datagram for `seq` carrying `payload`.
    pub fn data(seq: u16, payload: Vec<u8>) -> Self {
        Self {
            header: Header {
                seq,
                ack: 0,
                payload_len: payload.len() as u16,
                checksum: 0, // filled in by encode
            },
            payload,
        }
    }

    /// Build a pure acknowledgement datagram carrying cumulative `ack`.
    pub fn ack(ack: u16) -> Self {
        Self {
            header: Header {
                seq: 0,
                ack,
                payload_len: 0,
                checksum: 0,
            },
            payload: Vec::new(),
        }
    }

    /// `true` when this datagram's payload does not fill [`MAX_PAYLOAD`],
    /// marking it as the final data-bearing datagram of a stream.
    pub fn is_short(&self, max_payload: usize) -> bool {
        self.payload.len() < max_payload
    }

    /// Serialise this datagram into a newly allocated byte vector.
    ///
    /// `header.payload_len` and `header.checksum` are computed from the actual
    /// payload; any values already stored in those fields are ignored.
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = self.payload.len();
        let mut buf = vec![0u8; HEADER_LEN + payload_len];

        buf[OFF_SEQ..OFF_SEQ + 2].copy_from_slice(&self.header.seq.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 2].copy_from_slice(&self.header.ack.to_be_bytes());
        buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2]
            .copy_from_slice(&(payload_len as u16).to_be_bytes());
        // Checksum field is zero while computing the checksum.
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&0u16.to_be_bytes());

        buf[HEADER_LEN..].copy_from_slice(&self.payload);

        let csum = internet_checksum(&buf);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());

        buf
    }

    /// Parse a [`Datagram`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the `payload_len` field disagrees with `buf.len()`, or
    /// - the checksum does not verify.
    pub fn decode(buf: &[u8]) -> Result<Self, DatagramError> {
        if buf.len() < HEADER_LEN {
            return Err(DatagramError::BufferTooShort);
        }

        let seq = u16::from_be_bytes(buf[OFF_SEQ..OFF_SEQ + 2].try_into().unwrap());
        let ack = u16::from_be_bytes(buf[OFF_ACK..OFF_ACK + 2].try_into().unwrap());
        let payload_len =
            u16::from_be_bytes(buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2].try_into().unwrap());
        let checksum =
            u16::from_be_bytes(buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].try_into().unwrap());

        if buf.len() != HEADER_LEN + payload_len as usize {
            return Err(DatagramError::LengthMismatch);
        }

        // Verify checksum: zero the stored field, recompute, compare.
        let mut scratch = buf.to_vec();
        scratch[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&0u16.to_be_bytes());
        if internet_checksum(&scratch) != checksum {
            return Err(DatagramError::ChecksumFailed);
        }

        Ok(Datagram {
            header: Header {
                seq,
                ack,
                payload_len,
                checksum,
            },
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatagramError {
    /// Buffer shorter than the fixed header size.
    #[error("buffer too short to contain a header")]
    BufferTooShort,
    /// `payload_len` field does not match the actual remaining bytes.
    #[error("payload_len field does not match remaining bytes")]
    LengthMismatch,
    /// Checksum did not match recomputed value.
    #[error("checksum verification failed")]
    ChecksumFailed,
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// Sum consecutive 16-bit big-endian words, fold the carry, return the
/// one's-complement.  The caller must zero any checksum field within `data`
/// before calling this function.
fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;

    while i + 1 < data.len() {
        sum += u32::from(u16::from_be_bytes([data[i], data[i + 1]]));
        i += 2;
    }
    // Odd trailing byte: pad with a zero byte on the right.
    if i < data.len() {
        sum += u32::from(data[i]) << 8;
    }

    // Fold 32-bit sum into 16 bits.
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

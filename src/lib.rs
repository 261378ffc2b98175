//! `file-over-udp` — one-way reliable file push over UDP using Go-Back-N.
//!
//! The sender reads a file in fixed-size chunks and streams them to a remote
//! receiver over an unreliable datagram channel.  Reliability comes from a
//! sliding window of unacknowledged datagrams, cumulative acknowledgements,
//! and whole-window retransmission on a single timer.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────┐  chunks   ┌───────────────┐  datagrams   ┌──────────┐
//!  │  Chunker  │──────────▶│    Session    │─────────────▶│ receiver │
//!  └───────────┘           │ (GBN window + │◀─────────────│  (peer)  │
//!                          │  one timer)   │  cumulative  └──────────┘
//!                          └───────┬───────┘     ACKs
//!                                  │ raw UDP datagrams
//!                          ┌───────▼───────┐
//!                          │  UdpChannel   │  (non-blocking tokio UdpSocket)
//!                          └───────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`datagram`]  — wire format (serialise / deserialise, checksum)
//! - [`window`]    — send-side sliding window and cumulative-ACK state
//! - [`timer`]     — the single retransmit countdown timer
//! - [`chunker`]   — fixed-size chunking of the input stream
//! - [`transport`] — datagram channel abstraction over UDP
//! - [`session`]   — the sender engine driving the transfer to completion

pub mod chunker;
pub mod datagram;
pub mod session;
pub mod timer;
pub mod transport;
pub mod window;

//! Fixed-size chunking of the input stream.
//!
//! [`Chunker`] reads the input in chunks of up to `max_payload` bytes, one
//! chunk per outbound datagram.  A chunk shorter than `max_payload`
//! (including an empty one) signals that the stream is exhausted; that is a
//! normal terminal condition, not an error.
//!
//! Note the consequence: a stream whose length is an exact multiple of
//! `max_payload` yields every byte in full chunks and then one final empty
//! chunk, so the receiver always observes a short chunk as the end-of-stream
//! signal.

use std::io::{self, Read};

/// Reads an input stream in datagram-sized chunks.
#[derive(Debug)]
pub struct Chunker<R> {
    reader: R,
    max_payload: usize,
}

impl<R: Read> Chunker<R> {
    pub fn new(reader: R, max_payload: usize) -> Self {
        assert!(max_payload >= 1, "chunk size must be at least 1");
        Self { reader, max_payload }
    }

    /// Read the next chunk of up to `max_payload` bytes.
    ///
    /// Loops over partial reads, so a returned chunk is shorter than
    /// `max_payload` only at end of stream.  Interrupted reads are retried.
    pub fn next_chunk(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.max_payload];
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

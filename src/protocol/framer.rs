//! Outer packet framing with checksum validation and resynchronization
//!
//! Frames on the descrambled stream are length-delimited: a byte with the
//! high bit set opens a frame, the next byte declares the payload length,
//! and the byte after the declared payload is a 7-bit additive checksum.
//! A high-bit byte arriving mid-payload abandons the frame in progress and
//! opens a new one, so the framer re-locks on the stream after any
//! corruption without external help.

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

/// A validated frame: the opening marker byte followed by the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    /// Marker byte plus payload bytes, in stream order
    pub bytes: Vec<u8>,
    /// Number of payload positions counted, including the checksum trailer
    pub data_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    /// Discarding bytes until a frame marker arrives
    Idle,
    /// Marker seen, next byte is the declared payload length
    WaitingLength,
    /// Accumulating payload bytes up to the declared length
    InPacket,
}

/// Incremental frame reassembler
///
/// Fed one byte at a time with both the raw wire byte and its descrambled
/// form; returns a [`Frame`] whenever a checksum validates.
#[derive(Debug)]
pub(crate) struct Framer {
    state: FramerState,
    buf: BytesMut,
    checksum: u8,
    expected: usize,
    data_count: usize,
}

impl Framer {
    pub fn new() -> Self {
        Framer {
            state: FramerState::Idle,
            buf: BytesMut::with_capacity(256),
            checksum: 0,
            expected: 0,
            data_count: 0,
        }
    }

    /// Advances the framer by one byte.
    ///
    /// `raw` is the byte as it arrived on the wire and `descrambled` the
    /// output of the stream descrambler for it. The checksum accumulator is
    /// seeded from `raw` when a frame opens from idle but from `descrambled`
    /// when it opens via mid-packet resynchronization; the two entry paths
    /// are kept distinct deliberately, matching the console's own framing.
    pub fn feed(&mut self, raw: u8, descrambled: u8) -> Option<Frame> {
        match self.state {
            FramerState::InPacket => {
                if descrambled & 0x80 != 0 {
                    // Resynchronize: drop the frame in progress and open a
                    // new one seeded from the descrambled marker
                    trace!(dropped = self.buf.len(), "resynchronizing mid-packet");
                    self.buf.clear();
                    self.buf.put_u8(descrambled);
                    self.checksum = descrambled;
                    self.state = FramerState::WaitingLength;
                    return None;
                }
                self.data_count += 1;
                if self.data_count > self.expected {
                    // This byte is the checksum trailer
                    self.checksum &= 0x7F;
                    self.state = FramerState::Idle;
                    if self.checksum == descrambled {
                        return Some(Frame {
                            bytes: self.buf.split().to_vec(),
                            data_count: self.data_count,
                        });
                    }
                    debug!(
                        expected = descrambled,
                        computed = self.checksum,
                        "frame checksum mismatch, discarding"
                    );
                    self.buf.clear();
                    return None;
                }
                self.buf.put_u8(descrambled);
                self.checksum = self.checksum.wrapping_add(descrambled);
                None
            }
            FramerState::WaitingLength => {
                self.expected = descrambled as usize;
                self.checksum = self.checksum.wrapping_add(descrambled);
                self.data_count = 0;
                self.state = FramerState::InPacket;
                None
            }
            FramerState::Idle => {
                if descrambled & 0x80 != 0 {
                    self.buf.clear();
                    self.buf.put_u8(descrambled);
                    // Idle entry path: seed from the raw source byte
                    self.checksum = raw;
                    self.state = FramerState::WaitingLength;
                }
                None
            }
        }
    }
}

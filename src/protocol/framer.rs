//! Varint length-delimited framing for the TCP front end.
//!
//! Each message on the wire is emitted as:
//!
//!   `<varint length><opcode u16 LE><payload>`
//!
//! The framer can be fed arbitrary chunks and yields whole frames when
//! available. Oversized or malformed length prefixes are skipped one byte at a
//! time so a confused peer cannot force a runaway allocation.
use bytes::{Buf, BytesMut};

/// Default maximum frame size
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

pub struct Framer {
    buf: BytesMut,
    max_frame: usize,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Framer {
    pub fn new(max_frame: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_frame,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Attempt to extract the next complete frame. Returns `None` only when
    /// more bytes are needed. An oversize or over-long varint drops the
    /// leading byte (resync) and scanning continues with what is left.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            if self.buf.is_empty() {
                return None;
            }
            match self.scan_prefix() {
                Prefix::Incomplete => return None,
                Prefix::Invalid => {
                    self.buf.advance(1);
                }
                Prefix::Length { header, len } => {
                    if self.buf.len() < header + len {
                        return None;
                    }
                    self.buf.advance(header);
                    return Some(self.buf.split_to(len).to_vec());
                }
            }
        }
    }

    fn scan_prefix(&self) -> Prefix {
        let mut len: usize = 0;
        let mut shift = 0u32;
        for (i, b) in self.buf.iter().enumerate() {
            len |= ((b & 0x7F) as usize) << shift;
            if (b & 0x80) == 0 {
                if len > self.max_frame {
                    return Prefix::Invalid;
                }
                return Prefix::Length { header: i + 1, len };
            }
            shift += 7;
            if shift > 28 {
                return Prefix::Invalid;
            }
        }
        Prefix::Incomplete
    }
}

enum Prefix {
    Incomplete,
    Invalid,
    Length { header: usize, len: usize },
}

/// Prefix `payload` with its varint length.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 5);
    let mut len = payload.len();
    loop {
        let byte = (len & 0x7F) as u8;
        len >>= 7;
        if len == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out.extend_from_slice(payload);
    out
}

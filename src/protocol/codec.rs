//! Little-endian field codec used by every inbound handler and outbound builder.
//!
//! The reader never panics on short input: each read checks the remaining
//! length first and reports [`CodecError::Truncated`] instead. Handlers bubble
//! that up with `?` and the session drops the message without closing.

use thiserror::Error;

/// Largest string length accepted from a client before the read is refused.
pub const MAX_STRING_LEN: usize = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A read needed more bytes than the message still holds.
    #[error("truncated message: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A width outside 1..=8 was requested, or a string prefix exceeded the cap.
    #[error("invalid length: {0}")]
    InvalidLength(usize),
}

/// Cursor over a single inbound message.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }

    /// Consume `width` bytes as an unsigned little-endian integer.
    pub fn decode_uint(&mut self, width: usize) -> Result<u64, CodecError> {
        if width == 0 || width > 8 {
            return Err(CodecError::InvalidLength(width));
        }
        let bytes = self.take(width)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn decode1(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn decode2(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn decode4(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn decode8(&mut self) -> Result<u64, CodecError> {
        self.decode_uint(8)
    }

    /// Signed 16-bit coordinate.
    pub fn decode_i16(&mut self) -> Result<i16, CodecError> {
        Ok(self.decode2()? as i16)
    }

    /// `u16` length prefix followed by that many bytes, decoded lossily as UTF-8.
    pub fn decode_str(&mut self) -> Result<String, CodecError> {
        let len = self.decode2()? as usize;
        if len > MAX_STRING_LEN {
            return Err(CodecError::InvalidLength(len));
        }
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn decode_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.take(len)
    }

    /// Everything after the cursor. Does not advance.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.take(len).map(|_| ())
    }
}

/// Builder for outbound messages.
#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    data: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_opcode(opcode: u16) -> Self {
        let mut w = Self {
            data: Vec::with_capacity(16),
        };
        w.encode2(opcode);
        w
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn encode1(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn encode_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn encode2(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn encode4(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn encode8(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn encode_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Strings longer than `u16::MAX` bytes are cut at the last char boundary that fits.
    pub fn encode_str(&mut self, value: &str) {
        let mut end = value.len().min(u16::MAX as usize);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        self.encode2(end as u16);
        self.data.extend_from_slice(&value.as_bytes()[..end]);
    }

    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}

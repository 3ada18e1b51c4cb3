//! Movement paths relayed for companions. Data only; the server keeps the end
//! point and stance and forwards the raw bytes untouched.

use super::codec::{CodecError, PacketReader};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSegment {
    pub kind: u8,
    pub to: Position,
    pub stance: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePath {
    pub start: Position,
    pub segments: Vec<MoveSegment>,
    /// Exact bytes consumed, for relaying to other clients.
    pub raw: Vec<u8>,
}

impl MovePath {
    pub fn decode(r: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        let from = r.position();
        let snapshot = r.rest();
        let start = Position::new(r.decode_i16()?, r.decode_i16()?);
        let count = r.decode1()? as usize;
        let mut segments = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = r.decode1()?;
            let to = Position::new(r.decode_i16()?, r.decode_i16()?);
            let stance = r.decode1()?;
            segments.push(MoveSegment { kind, to, stance });
        }
        let used = r.position() - from;
        Ok(Self {
            start,
            segments,
            raw: snapshot[..used].to_vec(),
        })
    }

    pub fn end(&self) -> Position {
        self.segments.last().map(|s| s.to).unwrap_or(self.start)
    }

    pub fn stance(&self) -> Option<u8> {
        self.segments.last().map(|s| s.stance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::PacketWriter;

    #[test]
    fn end_point_comes_from_last_segment() {
        let mut w = PacketWriter::new();
        w.encode_i16(10);
        w.encode_i16(-5);
        w.encode1(2);
        for (x, stance) in [(20i16, 4u8), (30, 6)] {
            w.encode1(0);
            w.encode_i16(x);
            w.encode_i16(-5);
            w.encode1(stance);
        }
        w.encode1(0xEE); // trailing byte not part of the path
        let bytes = w.into_vec();
        let mut r = PacketReader::new(&bytes);
        let path = MovePath::decode(&mut r).unwrap();
        assert_eq!(path.end(), Position::new(30, -5));
        assert_eq!(path.stance(), Some(6));
        assert_eq!(path.raw.len(), bytes.len() - 1);
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn empty_path_ends_at_start() {
        let bytes = [1, 0, 2, 0, 0];
        let mut r = PacketReader::new(&bytes);
        let path = MovePath::decode(&mut r).unwrap();
        assert_eq!(path.end(), Position::new(1, 2));
        assert_eq!(path.stance(), None);
    }
}

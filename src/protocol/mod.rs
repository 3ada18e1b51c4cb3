//! Wire protocol: header catalogue, field codec, framing and outbound messages.

pub mod codec;
pub mod framer;
pub mod header;
pub mod movement;
pub mod outbound;

pub use codec::{CodecError, PacketReader, PacketWriter};
pub use framer::{encode_frame, Framer};
pub use header::Header;
pub use movement::{MovePath, Position};
pub use outbound::{Outbound, RemovalAnimation};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{FRAME_HEADER_LEN, FRAME_MAGIC};

/// Bit 0 of `flags`: this frame's payload is a keyframe, decodable without
/// reference to any prior frame. Bits 1–7 are reserved and must be zero on
/// send; a decoder ignores them on receive for forward compatibility.
pub const KEYFRAME_FLAG: u8 = 0b0000_0001;

/// A decoded frame packet: `0xDA 0x7E | flags:u8 | seq:u32 | len:u32 | payload[len]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePacket {
    pub flags: u8,
    pub seq: u32,
    pub payload: Bytes,
}

impl FramePacket {
    #[must_use]
    pub fn is_keyframe(&self) -> bool {
        self.flags & KEYFRAME_FLAG != 0
    }

    /// Encode `(seq, flags, payload)` into a wire-ready frame packet.
    ///
    /// Pure function: the same inputs always produce the same bytes.
    #[must_use]
    pub fn encode(seq: u32, flags: u8, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
        buf.put_slice(&FRAME_MAGIC);
        buf.put_u8(flags);
        buf.put_u32_le(seq);
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(payload);
        buf.freeze()
    }
}

use bytes::{BufMut, Bytes, BytesMut};

use crate::ACK_MAGIC;

/// A decoded ack packet (device→host): `0xDA 0x7A | seq:u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    pub seq: u32,
}

impl AckPacket {
    #[must_use]
    pub fn encode(seq: u32) -> Bytes {
        let mut buf = BytesMut::with_capacity(crate::ACK_LEN);
        buf.put_slice(&ACK_MAGIC);
        buf.put_u32_le(seq);
        buf.freeze()
    }
}

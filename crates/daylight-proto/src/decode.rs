use bytes::{Buf, Bytes, BytesMut};

use crate::{
    ack::AckPacket, command::CommandPacket, frame::FramePacket, magic_kind, MagicKind, ACK_LEN,
    CMD_LEN, FRAME_HEADER_LEN,
};

/// One parsed unit from the incoming byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPacket {
    Frame(FramePacket),
    Ack(AckPacket),
    Command(CommandPacket),
    /// `n` bytes were skipped while resyncing past unrecognized data.
    Garbage(usize),
}

/// Errors the decoder can report. Currently unused by [`Decoder::poll`]
/// (malformed-but-recognized packets cannot occur: the header fully
/// determines the payload length), kept for callers that want to
/// distinguish "no data yet" from a hard parse failure in their own
/// wrapping logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("buffer too short: need {need} more byte(s)")]
    Incomplete { need: usize },
}

/// Incremental, resyncing byte-stream parser.
///
/// Tolerant to partial reads: [`Self::poll`] never blocks and never
/// requires more bytes than the currently parsed header declares. Feed it
/// bytes as they arrive from the socket and drain it with `poll()` in a
/// loop until it returns `None`.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: BytesMut,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Append newly-read bytes to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Try to parse the next packet out of the buffer.
    ///
    /// Returns `None` when the buffer holds an incomplete prefix of a
    /// packet and more bytes are needed; the caller should `feed` more
    /// data and call `poll` again.
    pub fn poll(&mut self) -> Option<DecodedPacket> {
        if self.buf.len() < 2 {
            return None;
        }

        match magic_kind(self.buf[0], self.buf[1]) {
            Some(MagicKind::Frame) => self.poll_frame(),
            Some(MagicKind::Ack) => self.poll_ack(),
            Some(MagicKind::Command) => self.poll_command(),
            None => self.resync(),
        }
    }

    fn poll_frame(&mut self) -> Option<DecodedPacket> {
        if self.buf.len() < FRAME_HEADER_LEN {
            return None;
        }
        let flags = self.buf[2];
        let seq = u32::from_le_bytes(self.buf[3..7].try_into().expect("4 bytes"));
        let len = u32::from_le_bytes(self.buf[7..11].try_into().expect("4 bytes")) as usize;
        let total = FRAME_HEADER_LEN + len;
        if self.buf.len() < total {
            return None;
        }
        self.buf.advance(FRAME_HEADER_LEN);
        let payload: Bytes = self.buf.split_to(len).freeze();
        Some(DecodedPacket::Frame(FramePacket { flags, seq, payload }))
    }

    fn poll_ack(&mut self) -> Option<DecodedPacket> {
        if self.buf.len() < ACK_LEN {
            return None;
        }
        let seq = u32::from_le_bytes(self.buf[2..6].try_into().expect("4 bytes"));
        self.buf.advance(ACK_LEN);
        Some(DecodedPacket::Ack(AckPacket { seq }))
    }

    fn poll_command(&mut self) -> Option<DecodedPacket> {
        if self.buf.len() < CMD_LEN {
            return None;
        }
        let cmd = self.buf[2];
        let value = self.buf[3];
        self.buf.advance(CMD_LEN);
        Some(DecodedPacket::Command(CommandPacket { cmd, value }))
    }

    /// The buffer's front 2 bytes are not a recognized magic. Scan forward
    /// for the next occurrence of any magic pair and drop everything
    /// before it, reporting how many bytes were skipped.
    fn resync(&mut self) -> Option<DecodedPacket> {
        let len = self.buf.len();
        let found = (1..=len.saturating_sub(2))
            .find(|&i| magic_kind(self.buf[i], self.buf[i + 1]).is_some());

        let drop_len = match found {
            Some(i) => i,
            None => {
                // No magic pair anywhere in the buffer. Keep a trailing
                // 0xDA byte in case it's the start of a magic that hasn't
                // fully arrived yet.
                if self.buf[len - 1] == 0xDA {
                    len - 1
                } else {
                    len
                }
            }
        };

        if drop_len == 0 {
            return None;
        }
        self.buf.advance(drop_len);
        Some(DecodedPacket::Garbage(drop_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::CommandId, frame::KEYFRAME_FLAG};

    #[test]
    fn decodes_keyframe_then_waits_for_more() {
        let bytes = FramePacket::encode(0, KEYFRAME_FLAG, &[0x80; 4]);
        let mut dec = Decoder::new();
        dec.feed(&bytes);
        let packet = dec.poll().expect("should decode");
        assert_eq!(
            packet,
            DecodedPacket::Frame(FramePacket {
                flags: KEYFRAME_FLAG,
                seq: 0,
                payload: Bytes::from_static(&[0x80; 4])
            })
        );
        assert_eq!(dec.poll(), None);
    }

    #[test]
    fn partial_header_yields_none_until_complete() {
        let bytes = FramePacket::encode(7, 0, &[1, 2, 3]);
        let mut dec = Decoder::new();
        dec.feed(&bytes[..5]);
        assert_eq!(dec.poll(), None);
        dec.feed(&bytes[5..]);
        assert_eq!(
            dec.poll(),
            Some(DecodedPacket::Frame(FramePacket {
                flags: 0,
                seq: 7,
                payload: Bytes::from_static(&[1, 2, 3])
            }))
        );
    }

    #[test]
    fn decodes_ack() {
        let bytes = AckPacket::encode(99);
        let mut dec = Decoder::new();
        dec.feed(&bytes);
        assert_eq!(dec.poll(), Some(DecodedPacket::Ack(AckPacket { seq: 99 })));
    }

    #[test]
    fn decodes_command() {
        let bytes = CommandPacket::encode(CommandId::Warmth, 12);
        let mut dec = Decoder::new();
        dec.feed(&bytes);
        assert_eq!(
            dec.poll(),
            Some(DecodedPacket::Command(CommandPacket { cmd: 0x02, value: 12 }))
        );
    }

    /// Scenario 6 from spec.md §8: a garbage prefix before a valid frame
    /// packet is resynced by the decoder and the frame is delivered intact.
    #[test]
    fn resyncs_past_garbage_prefix() {
        let mut dec = Decoder::new();
        dec.feed(&[
            0x00, 0x00, 0xDA, 0x7E, 0x01, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0xAA,
            0xBB, 0xCC, 0xDD, 0xEE,
        ]);
        assert_eq!(dec.poll(), Some(DecodedPacket::Garbage(2)));
        assert_eq!(
            dec.poll(),
            Some(DecodedPacket::Frame(FramePacket {
                flags: 0x01,
                seq: 0,
                payload: Bytes::from_static(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE])
            }))
        );
        assert_eq!(dec.poll(), None);
    }

    #[test]
    fn keeps_trailing_da_byte_for_next_feed() {
        let mut dec = Decoder::new();
        dec.feed(&[0x01, 0x02, 0x03, 0xDA]);
        assert_eq!(dec.poll(), Some(DecodedPacket::Garbage(3)));
        assert_eq!(dec.poll(), None);
        dec.feed(&[0x7A, 0x00, 0x00, 0x00, 0x05]);
        assert_eq!(dec.poll(), Some(DecodedPacket::Ack(AckPacket { seq: 5 })));
    }

    proptest::proptest! {
        #[test]
        fn frame_round_trip(seq: u32, flags: u8, payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let flags = flags & KEYFRAME_FLAG; // only bit 0 is meaningful on send
            let bytes = FramePacket::encode(seq, flags, &payload);
            let mut dec = Decoder::new();
            dec.feed(&bytes);
            let decoded = dec.poll();
            proptest::prop_assert_eq!(
                decoded,
                Some(DecodedPacket::Frame(FramePacket { flags, seq, payload: Bytes::from(payload) }))
            );
        }

        #[test]
        fn ack_round_trip(seq: u32) {
            let bytes = AckPacket::encode(seq);
            let mut dec = Decoder::new();
            dec.feed(&bytes);
            proptest::prop_assert_eq!(dec.poll(), Some(DecodedPacket::Ack(AckPacket { seq })));
        }

        #[test]
        fn command_round_trip(cmd: u8, value: u8) {
            let bytes = crate::CommandPacket::encode(
                crate::command::CommandId::from_u8(cmd).unwrap_or(crate::command::CommandId::Brightness),
                value,
            );
            let mut dec = Decoder::new();
            dec.feed(&bytes);
            let Some(DecodedPacket::Command(pkt)) = dec.poll() else {
                panic!("expected command packet");
            };
            proptest::prop_assert_eq!(pkt.value, value);
        }
    }
}

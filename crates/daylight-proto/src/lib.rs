//! Wire protocol for the Daylight Mirror host↔device link.
//!
//! Three little-endian packet shapes, all framed by a 2-byte magic:
//! frame packets (host→device), ack packets (device→host), and command
//! packets (host→device). See [`decode::Decoder`] for the incremental,
//! resyncing byte-stream parser.

pub mod ack;
pub mod command;
pub mod decode;
pub mod frame;

pub use ack::AckPacket;
pub use command::{CommandId, CommandPacket};
pub use decode::{DecodeError, Decoder, DecodedPacket};
pub use frame::{FramePacket, KEYFRAME_FLAG};

/// Magic bytes prefixing a frame packet (host→device).
pub const FRAME_MAGIC: [u8; 2] = [0xDA, 0x7E];
/// Magic bytes prefixing an ack packet (device→host).
pub const ACK_MAGIC: [u8; 2] = [0xDA, 0x7A];
/// Magic bytes prefixing a command packet (host→device).
pub const CMD_MAGIC: [u8; 2] = [0xDA, 0x7F];

/// Total header length of a frame packet: magic(2) + flags(1) + seq(4) + len(4).
pub const FRAME_HEADER_LEN: usize = 11;
/// Total length of an ack packet: magic(2) + seq(4).
pub const ACK_LEN: usize = 6;
/// Total length of a command packet: magic(2) + cmd(1) + value(1).
pub const CMD_LEN: usize = 4;

#[must_use]
pub(crate) fn magic_kind(a: u8, b: u8) -> Option<MagicKind> {
    match [a, b] {
        m if m == FRAME_MAGIC => Some(MagicKind::Frame),
        m if m == ACK_MAGIC => Some(MagicKind::Ack),
        m if m == CMD_MAGIC => Some(MagicKind::Command),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MagicKind {
    Frame,
    Ack,
    Command,
}

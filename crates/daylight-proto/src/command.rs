use bytes::{BufMut, Bytes, BytesMut};

use crate::CMD_MAGIC;

/// A decoded command packet (host→device): `0xDA 0x7F | cmd:u8 | value:u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPacket {
    pub cmd: u8,
    pub value: u8,
}

/// Known command identifiers. Values always fit 0–255 for `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    /// Set brightness (0–255).
    Brightness = 0x01,
    /// Set warmth (0–255); the device maps this linearly to its amber rate.
    Warmth = 0x02,
    /// Toggle backlight on/off. `value` is ignored by the device, send 0.
    BacklightToggle = 0x03,
    /// Switch to a resolution preset (advisory; see `command::ResolutionPreset`).
    Resolution = 0x04,
}

impl CommandId {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Brightness),
            0x02 => Some(Self::Warmth),
            0x03 => Some(Self::BacklightToggle),
            0x04 => Some(Self::Resolution),
            _ => None,
        }
    }
}

/// Resolution presets carried as the `value` byte of a `Resolution` command.
/// The device treats the command as advisory (spec §9 Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResolutionPreset {
    /// 800×600, Cozy HiDPI.
    Cozy = 0x00,
    /// 1024×768, Comfortable.
    Comfortable = 0x01,
    /// 1280×960, Balanced.
    Balanced = 0x02,
    /// 1600×1200, Sharp.
    Sharp = 0x03,
}

impl ResolutionPreset {
    #[must_use]
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Cozy => (800, 600),
            Self::Comfortable => (1024, 768),
            Self::Balanced => (1280, 960),
            Self::Sharp => (1600, 1200),
        }
    }
}

impl CommandPacket {
    #[must_use]
    pub fn encode(cmd: CommandId, value: u8) -> Bytes {
        let mut buf = BytesMut::with_capacity(crate::CMD_LEN);
        buf.put_slice(&CMD_MAGIC);
        buf.put_u8(cmd.as_u8());
        buf.put_u8(value);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_brightness_command() {
        let bytes = CommandPacket::encode(CommandId::Brightness, 0x80);
        assert_eq!(&bytes[..], &[0xDA, 0x7F, 0x01, 0x80]);
    }

    #[test]
    fn resolution_presets_map_to_spec_dimensions() {
        assert_eq!(ResolutionPreset::Cozy.dimensions(), (800, 600));
        assert_eq!(ResolutionPreset::Comfortable.dimensions(), (1024, 768));
        assert_eq!(ResolutionPreset::Balanced.dimensions(), (1280, 960));
        assert_eq!(ResolutionPreset::Sharp.dimensions(), (1600, 1200));
    }
}

use std::sync::Mutex;

use bytes::Bytes;
use daylight_proto::{CommandId, CommandPacket};
use tokio::sync::mpsc;

use crate::event::DaylightEvent;

/// Device-side resolution preset, mirrored from [`daylight_proto::command::ResolutionPreset`]
/// so this crate doesn't need to depend on the proto crate's command
/// module layout beyond the packet encoder.
pub use daylight_proto::command::ResolutionPreset;

/// Current display state, satisfying the invariants from spec §3:
/// `backlight_on <=> current_brightness > 0`, and `saved_brightness >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    pub current_brightness: u8,
    pub warmth: u8,
    pub backlight_on: bool,
    pub saved_brightness: u8,
    pub resolution: ResolutionPreset,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            current_brightness: 255,
            warmth: 0,
            backlight_on: true,
            saved_brightness: 255,
            resolution: ResolutionPreset::Balanced,
        }
    }
}

#[cfg(debug_assertions)]
impl DisplayState {
    fn check_invariants(&self) {
        debug_assert_eq!(self.backlight_on, self.current_brightness > 0);
        debug_assert!(self.saved_brightness >= 1);
    }
}

/// Display control channel (spec §4.8): clamps every request into
/// `[0, 255]`, updates the in-memory [`DisplayState`], emits the
/// corresponding command packet to every connected client, and publishes
/// a [`DaylightEvent::DisplayStateChanged`] — all regardless of whether
/// any client is currently connected.
pub struct DisplayControl {
    state: Mutex<DisplayState>,
    commands: mpsc::UnboundedSender<Bytes>,
    events: tokio::sync::broadcast::Sender<DaylightEvent>,
}

impl DisplayControl {
    #[must_use]
    pub fn new(
        initial: DisplayState,
        commands: mpsc::UnboundedSender<Bytes>,
        events: tokio::sync::broadcast::Sender<DaylightEvent>,
    ) -> Self {
        Self { state: Mutex::new(initial), commands, events }
    }

    #[must_use]
    pub fn state(&self) -> DisplayState {
        *self.state.lock().unwrap()
    }

    pub fn set_brightness(&self, value: i32) -> DisplayState {
        let clamped = clamp_u8(value);
        let state = {
            let mut state = self.state.lock().unwrap();
            state.current_brightness = clamped;
            state.backlight_on = clamped > 0;
            if clamped > 0 {
                state.saved_brightness = clamped;
            }
            #[cfg(debug_assertions)]
            state.check_invariants();
            *state
        };
        self.emit(CommandId::Brightness, clamped, state);
        state
    }

    pub fn set_warmth(&self, value: i32) -> DisplayState {
        let clamped = clamp_u8(value);
        let state = {
            let mut state = self.state.lock().unwrap();
            state.warmth = clamped;
            *state
        };
        self.emit(CommandId::Warmth, clamped, state);
        state
    }

    /// Turning the backlight off stores `max(current_brightness, 1)` as
    /// `saved_brightness` and emits `brightness=0`; turning it back on
    /// restores `saved_brightness`.
    pub fn toggle_backlight(&self) -> DisplayState {
        let (state, emitted_value) = {
            let mut state = self.state.lock().unwrap();
            let emitted = if state.backlight_on {
                state.saved_brightness = state.current_brightness.max(1);
                state.current_brightness = 0;
                state.backlight_on = false;
                0
            } else {
                state.current_brightness = state.saved_brightness;
                state.backlight_on = true;
                state.saved_brightness
            };
            #[cfg(debug_assertions)]
            state.check_invariants();
            (*state, emitted)
        };
        self.emit(CommandId::Brightness, emitted_value, state);
        state
    }

    pub fn set_resolution(&self, preset: ResolutionPreset) -> DisplayState {
        let state = {
            let mut state = self.state.lock().unwrap();
            state.resolution = preset;
            *state
        };
        self.emit(CommandId::Resolution, preset as u8, state);
        state
    }

    fn emit(&self, cmd: CommandId, value: u8, state: DisplayState) {
        let packet = CommandPacket::encode(cmd, value);
        let _ = self.commands.send(packet);
        let _ = self.events.send(DaylightEvent::DisplayStateChanged(state));
    }
}

fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, i32::from(u8::MAX)) as u8
}

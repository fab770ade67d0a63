use crate::delta::xor_delta;
use crate::error::CaptureError;

/// Owns the three pixel planes and the compression scratch buffer for one
/// session. Allocates once at construction; every later operation reuses
/// these buffers, so a sustained stream produces no unbounded memory
/// growth (spec §8).
///
/// The only mutation path that crosses planes is [`Self::encode_frame`]'s
/// XOR step, which writes `delta` from `current` and `previous`.
pub struct FrameBuffers {
    current: Vec<u8>,
    previous: Vec<u8>,
    delta: Vec<u8>,
    scratch: Vec<u8>,
    pixel_count: usize,
}

impl FrameBuffers {
    /// Allocate buffers for a `width`×`height` greyscale session.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = width as usize * height as usize;
        let scratch_len = lz4_flex::block::get_maximum_output_size(pixel_count);
        Self {
            current: vec![0u8; pixel_count],
            previous: vec![0u8; pixel_count],
            delta: vec![0u8; pixel_count],
            scratch: vec![0u8; scratch_len],
            pixel_count,
        }
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    #[must_use]
    pub fn current(&self) -> &[u8] {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut [u8] {
        &mut self.current
    }

    #[must_use]
    pub fn previous(&self) -> &[u8] {
        &self.previous
    }

    #[must_use]
    pub fn delta(&self) -> &[u8] {
        &self.delta
    }

    pub fn scratch(&self) -> &[u8] {
        &self.scratch
    }

    /// Swap `current` and `previous` after a frame has been handed to the
    /// codec. `previous` thereafter equals the plane most recently encoded.
    pub fn swap_current_previous(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    /// Produce the compressed payload for the current frame (spec §4.3).
    ///
    /// A keyframe compresses `current` directly; a delta frame XORs
    /// `current` against `previous` into the `delta` plane first, then
    /// compresses `delta`. Either way the result lands in `scratch` and
    /// the returned slice borrows it — callers must copy out (or hand it
    /// to the fanout broadcast) before the next `encode_frame` call.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Compress`] if LZ4 reports failure; this is
    /// fatal for the frame and the caller must force a keyframe next.
    pub fn encode_frame(&mut self, seq: u32, is_keyframe: bool) -> Result<&[u8], CaptureError> {
        let compressed_len = if is_keyframe {
            lz4_flex::block::compress_into(&self.current, &mut self.scratch)
                .map_err(|source| CaptureError::Compress { seq, source })?
        } else {
            xor_delta(&self.current, &self.previous, &mut self.delta);
            lz4_flex::block::compress_into(&self.delta, &mut self.scratch)
                .map_err(|source| CaptureError::Compress { seq, source })?
        };
        Ok(&self.scratch[..compressed_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframe_compresses_current_directly() {
        let mut buffers = FrameBuffers::new(4, 4);
        buffers.current_mut().fill(0x80);
        let payload = buffers.encode_frame(0, true).unwrap().to_vec();
        let mut decompressed = vec![0u8; 16];
        lz4_flex::block::decompress_into(&payload, &mut decompressed).unwrap();
        assert_eq!(decompressed, vec![0x80u8; 16]);
    }

    #[test]
    fn delta_compresses_xor_of_current_and_previous() {
        let mut buffers = FrameBuffers::new(4, 4);
        buffers.current_mut().fill(0x80);
        let _ = buffers.encode_frame(0, true).unwrap();
        buffers.swap_current_previous();

        // Same content again: delta against previous is all zeros.
        buffers.current_mut().fill(0x80);
        let payload = buffers.encode_frame(1, false).unwrap().to_vec();
        let mut decompressed = vec![0xFFu8; 16];
        let n = lz4_flex::block::decompress_into(&payload, &mut decompressed).unwrap();
        assert_eq!(&decompressed[..n], &[0u8; 16]);
    }

    #[test]
    fn swap_rotates_current_into_previous() {
        let mut buffers = FrameBuffers::new(2, 2);
        buffers.current_mut().copy_from_slice(&[1, 2, 3, 4]);
        buffers.swap_current_previous();
        assert_eq!(buffers.previous(), &[1, 2, 3, 4]);
    }

    #[test]
    fn no_reallocation_across_many_frames() {
        let mut buffers = FrameBuffers::new(8, 8);
        let cap_before =
            (buffers.current.capacity(), buffers.previous.capacity(), buffers.scratch.capacity());
        for seq in 0..64u32 {
            buffers.current_mut().fill((seq % 255) as u8);
            let _ = buffers.encode_frame(seq, seq % 30 == 0).unwrap();
            buffers.swap_current_previous();
        }
        let cap_after =
            (buffers.current.capacity(), buffers.previous.capacity(), buffers.scratch.capacity());
        assert_eq!(cap_before, cap_after);
    }
}

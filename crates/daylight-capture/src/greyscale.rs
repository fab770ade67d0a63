/// BT.601 integer luma coefficients for BGRA input, `/256`.
const COEFF_B: u32 = 29;
const COEFF_G: u32 = 150;
const COEFF_R: u32 = 77;

/// Convert a BGRA plane (arbitrary row stride, alpha ignored) to tight
/// 8-bit greyscale (stride = `width`).
///
/// Deterministic: identical input bytes always produce identical output,
/// across runs and across implementations, since the coefficients are
/// fixed integers rather than floating point. `src_stride` may exceed
/// `width * 4` because of per-row padding; `dst` must be exactly
/// `width * height` bytes.
///
/// # Panics
///
/// Panics if `src` is too short for `height` rows of `src_stride` bytes,
/// or if `dst` is shorter than `width * height`.
pub fn bgra_to_greyscale(src: &[u8], src_stride: usize, width: u32, height: u32, dst: &mut [u8]) {
    let w = width as usize;
    let h = height as usize;
    assert!(src_stride >= w * 4, "row stride must cover at least width*4 bytes");
    assert!(dst.len() >= w * h, "destination plane too small");
    assert!(src.len() >= src_stride * h, "source plane too small for stride*height");

    for row in 0..h {
        let src_row = &src[row * src_stride..row * src_stride + w * 4];
        let dst_row = &mut dst[row * w..(row + 1) * w];
        for (px, out) in src_row.chunks_exact(4).zip(dst_row.iter_mut()) {
            let b = u32::from(px[0]);
            let g = u32::from(px[1]);
            let r = u32::from(px[2]);
            #[allow(clippy::cast_possible_truncation)]
            let luma = ((b * COEFF_B + g * COEFF_G + r * COEFF_R) >> 8) as u8;
            *out = luma;
        }
    }
}

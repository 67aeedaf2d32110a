use crate::common::Rotation;

/// Rotates a tightly packed RGBA8 buffer with a single strided remap.
///
/// Source pixel `(i, j)` of a `W` x `H` buffer lands at destination index
/// `origin + i * step_x + j * step_y`:
///
/// - 90°: `dest(j, W-1-i)`, output `H` x `W`
/// - 180°: `dest(W-1-i, H-1-j)`
/// - 270°: `dest(H-1-j, i)`, output `H` x `W`
///
/// Returns the output dimensions with the remapped buffer.
pub fn rotate_rgba(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    rotation: Rotation,
) -> (u32, u32, Vec<u8>) {
    let (w, h) = (width as isize, height as isize);
    let (origin, step_x, step_y) = match rotation {
        Rotation::None => return (width, height, pixels),
        Rotation::Cw90 => ((w - 1) * h, -h, 1),
        Rotation::Cw180 => (w * h - 1, -1, -w),
        Rotation::Cw270 => (h - 1, h, -1),
    };

    let mut out = vec![0u8; pixels.len()];
    let row_len = width as usize * 4;
    if row_len > 0 {
        for (j, row) in pixels.chunks_exact(row_len).enumerate() {
            let mut dst = origin + j as isize * step_y;
            for px in row.chunks_exact(4) {
                let offset = dst as usize * 4;
                out[offset..offset + 4].copy_from_slice(px);
                dst += step_x;
            }
        }
    }

    if rotation.swaps_dimensions() {
        (height, width, out)
    } else {
        (width, height, out)
    }
}

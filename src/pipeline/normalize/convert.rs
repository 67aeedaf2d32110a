use crate::common::{PixelFormat, RawFrame};
use crate::error::ConversionError;

// BT.601 YUV-to-RGB conversion for a single pixel (fixed-point, shift 8)
fn yuv_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    let r = (y + ((359 * v) >> 8)).clamp(0, 255) as u8;
    let g = (y - ((88 * u + 183 * v) >> 8)).clamp(0, 255) as u8;
    let b = (y + ((454 * u) >> 8)).clamp(0, 255) as u8;
    [r, g, b, 0xFF]
}

/// Converts a raw sensor buffer to RGBA8, mirrored on the X axis in the
/// same pass: output pixel `(x, y)` comes from source pixel `(W-1-x, y)`.
pub fn to_rgba_mirrored(raw: &RawFrame) -> Result<Vec<u8>, ConversionError> {
    let (width, height) = (raw.width, raw.height);
    if width == 0 || height == 0 {
        return Err(ConversionError::EmptyFrame { width, height });
    }
    let expected = raw
        .format
        .required_len(width, height)
        .ok_or(ConversionError::UnsupportedFormat(raw.format))?;
    if raw.data.len() < expected {
        return Err(ConversionError::BufferTooShort {
            format: raw.format,
            expected,
            actual: raw.data.len(),
        });
    }

    let (w, h) = (width as usize, height as usize);
    let d = &raw.data[..];
    let chroma_w = w.div_ceil(2);
    let chroma_h = h.div_ceil(2);

    let rgba = match raw.format {
        PixelFormat::Rgba8 => fill_mirrored(w, h, |x, y| {
            let i = (y * w + x) * 4;
            [d[i], d[i + 1], d[i + 2], d[i + 3]]
        }),
        PixelFormat::Bgra8 => fill_mirrored(w, h, |x, y| {
            let i = (y * w + x) * 4;
            [d[i + 2], d[i + 1], d[i], d[i + 3]]
        }),
        PixelFormat::Rgb8 => fill_mirrored(w, h, |x, y| {
            let i = (y * w + x) * 3;
            [d[i], d[i + 1], d[i + 2], 0xFF]
        }),
        PixelFormat::Gray8 => fill_mirrored(w, h, |x, y| {
            let g = d[y * w + x];
            [g, g, g, 0xFF]
        }),
        PixelFormat::Yuyv => {
            let stride = chroma_w * 4;
            fill_mirrored(w, h, |x, y| {
                let base = y * stride + (x / 2) * 4;
                yuv_to_rgba(d[base + (x % 2) * 2], d[base + 1], d[base + 3])
            })
        }
        PixelFormat::Yu12 => {
            let u_plane = w * h;
            let v_plane = u_plane + chroma_w * chroma_h;
            fill_mirrored(w, h, |x, y| {
                let c = (y / 2) * chroma_w + x / 2;
                yuv_to_rgba(d[y * w + x], d[u_plane + c], d[v_plane + c])
            })
        }
        PixelFormat::Nv21 => {
            let vu_plane = w * h;
            fill_mirrored(w, h, |x, y| {
                let c = vu_plane + (y / 2) * chroma_w * 2 + (x / 2) * 2;
                yuv_to_rgba(d[y * w + x], d[c + 1], d[c])
            })
        }
        PixelFormat::Unknown(_) => return Err(ConversionError::UnsupportedFormat(raw.format)),
    };

    Ok(rgba)
}

fn fill_mirrored(w: usize, h: usize, sample: impl Fn(usize, usize) -> [u8; 4]) -> Vec<u8> {
    let mut rgba = vec![0u8; w * h * 4];
    for (y, row) in rgba.chunks_exact_mut(w * 4).enumerate() {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&sample(w - 1 - x, y));
        }
    }
    rgba
}

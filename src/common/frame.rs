use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// fourcc codes
const FOURCC_RGBA: u32 = u32::from_le_bytes(*b"RGBA");
const FOURCC_BGRA: u32 = u32::from_le_bytes(*b"BGRA");
const FOURCC_RGB3: u32 = u32::from_le_bytes(*b"RGB3");
const FOURCC_GREY: u32 = u32::from_le_bytes(*b"GREY");
const FOURCC_YUYV: u32 = u32::from_le_bytes(*b"YUYV");
const FOURCC_YU12: u32 = u32::from_le_bytes(*b"YU12");
const FOURCC_NV21: u32 = u32::from_le_bytes(*b"NV21");

/// Pixel layout reported by the sensor for a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Rgb8,
    Gray8,
    /// Packed YUV 4:2:2, `[Y0, U, Y1, V]` per pixel pair.
    Yuyv,
    /// Planar YUV 4:2:0, Y plane then U plane then V plane.
    Yu12,
    /// Semi-planar YUV 4:2:0, Y plane then interleaved V/U plane.
    Nv21,
    Unknown(u32),
}

impl PixelFormat {
    pub fn from_fourcc(fourcc: u32) -> Self {
        match fourcc {
            FOURCC_RGBA => PixelFormat::Rgba8,
            FOURCC_BGRA => PixelFormat::Bgra8,
            FOURCC_RGB3 => PixelFormat::Rgb8,
            FOURCC_GREY => PixelFormat::Gray8,
            FOURCC_YUYV => PixelFormat::Yuyv,
            FOURCC_YU12 => PixelFormat::Yu12,
            FOURCC_NV21 => PixelFormat::Nv21,
            other => PixelFormat::Unknown(other),
        }
    }

    /// Minimum buffer length for a tightly packed `width` x `height` frame,
    /// or `None` when the format is not understood.
    pub fn required_len(&self, width: u32, height: u32) -> Option<usize> {
        let (w, h) = (width as usize, height as usize);
        let chroma = w.div_ceil(2) * h.div_ceil(2);
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => Some(w * h * 4),
            PixelFormat::Rgb8 => Some(w * h * 3),
            PixelFormat::Gray8 => Some(w * h),
            PixelFormat::Yuyv => Some(w.div_ceil(2) * 4 * h),
            PixelFormat::Yu12 | PixelFormat::Nv21 => Some(w * h + chroma * 2),
            PixelFormat::Unknown(_) => None,
        }
    }
}

/// A buffer as handed over by the camera, before any conversion.
///
/// The sampler moves it into the normalizer, which drops it once the
/// conversion pass is done, whatever the result.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
    pub captured_at: DateTime<Utc>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            format,
            data: data.into(),
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_round_trips_known_formats() {
        assert_eq!(
            PixelFormat::from_fourcc(u32::from_le_bytes(*b"NV21")),
            PixelFormat::Nv21
        );
        let unknown = u32::from_le_bytes(*b"pRAA");
        assert_eq!(
            PixelFormat::from_fourcc(unknown),
            PixelFormat::Unknown(unknown)
        );
    }

    #[test]
    fn required_len_rounds_chroma_up() {
        assert_eq!(PixelFormat::Rgba8.required_len(3, 2), Some(24));
        assert_eq!(PixelFormat::Yuyv.required_len(3, 2), Some(16));
        assert_eq!(PixelFormat::Yu12.required_len(3, 3), Some(9 + 4 * 2));
        assert_eq!(PixelFormat::Unknown(0).required_len(3, 3), None);
    }

    #[test]
    fn cloning_raw_frame_shares_buffer() {
        let frame = RawFrame::new(2, 2, PixelFormat::Gray8, vec![1u8, 2, 3, 4]);
        let copy = frame.clone();
        assert_eq!(frame.data.as_ptr(), copy.data.as_ptr());
    }
}

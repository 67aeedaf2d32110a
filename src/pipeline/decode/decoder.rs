use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder as _, ImageDecoder, Limits};
use tracing::trace;

use super::animation::{AnimatedImage, Frame};
use crate::error::DecodeError;

/// Largest logical screen side accepted from a compute payload.
pub const MAX_DIMENSION: u32 = 4096;
/// Upper bound on buffers held while compositing.
pub const MAX_ALLOC: u64 = 256 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_ALLOC);
    limits
}

fn to_frame(frame: image::Frame) -> Frame {
    let (numer, denom) = frame.delay().numer_denom_ms();
    let delay = Duration::from_nanos(u64::from(numer) * 1_000_000 / u64::from(denom.max(1)));
    let buffer = frame.into_buffer();
    let (width, height) = buffer.dimensions();
    Frame::new(width, height, buffer.into_raw(), delay)
}

/// Decodes a GIF into fully composited frames.
///
/// Frames are pulled one at a time; the first error discards everything
/// decoded so far.
pub fn decode_animation(data: &[u8]) -> Result<AnimatedImage, DecodeError> {
    let mut decoder = GifDecoder::new(Cursor::new(data))?;
    let (width, height) = decoder.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }
    decoder.set_limits(decode_limits())?;

    let mut frames = Vec::new();
    for frame in decoder.into_frames() {
        let frame = to_frame(frame?);
        trace!("Frame {} delay {:?}", frames.len(), frame.delay());
        frames.push(frame);
    }
    AnimatedImage::new(width, height, frames)
}

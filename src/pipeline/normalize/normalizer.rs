use tracing::debug;

use super::convert::to_rgba_mirrored;
use super::rotate::rotate_rgba;
use crate::common::{NormalizedImage, Orientation, RawFrame};
use crate::error::ConversionError;

/// Mirror-converts the raw frame to RGBA8, then applies the net rotation for
/// `orientation`. The raw frame is consumed and released on every path.
pub fn normalize(raw: RawFrame, orientation: Orientation) -> Result<NormalizedImage, ConversionError> {
    let (width, height, frame_id) = (raw.width, raw.height, raw.id);
    let rgba = to_rgba_mirrored(&raw)?;
    drop(raw);

    let rotation = orientation.net_rotation();
    let (out_width, out_height, pixels) = rotate_rgba(rgba, width, height, rotation);
    debug!(
        "Normalized frame {} {}x{} -> {}x{} ({}°)",
        frame_id,
        width,
        height,
        out_width,
        out_height,
        rotation.degrees()
    );

    let actual = pixels.len();
    NormalizedImage::new(out_width, out_height, pixels).ok_or(ConversionError::SizeMismatch {
        expected: out_width as usize * out_height as usize * 4,
        actual,
    })
}

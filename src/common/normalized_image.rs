use image::RgbaImage;

/// Canonical RGBA8 image, row-major with a top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl NormalizedImage {
    /// Returns `None` unless `pixels` holds exactly `width * height` RGBA pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(px)
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        // the length invariant makes this infallible
        RgbaImage::from_raw(self.width, self.height, self.pixels)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }
}

impl From<RgbaImage> for NormalizedImage {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(NormalizedImage::new(2, 2, vec![0; 15]).is_none());
        assert!(NormalizedImage::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let image = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let normalized = NormalizedImage::from(image);
        assert_eq!(normalized.pixel(2, 1), Some([2, 1, 0, 255]));
        assert_eq!(normalized.pixel(3, 0), None);
    }
}

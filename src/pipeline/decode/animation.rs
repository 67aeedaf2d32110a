use std::time::Duration;

use crate::error::DecodeError;

/// One fully composited RGBA8 frame of an animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    delay: Duration,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, delay: Duration) -> Self {
        Self {
            width,
            height,
            pixels,
            delay,
        }
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

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn delay_seconds(&self) -> f64 {
        self.delay.as_secs_f64()
    }
}

/// Non-empty, display-ordered frame sequence sharing one logical size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimatedImage {
    width: u32,
    height: u32,
    frames: Vec<Frame>,
}

impl AnimatedImage {
    pub fn new(width: u32, height: u32, frames: Vec<Frame>) -> Result<Self, DecodeError> {
        if frames.is_empty() {
            return Err(DecodeError::NoFrames);
        }
        if let Some(frame) = frames
            .iter()
            .find(|f| f.width != width || f.height != height)
        {
            return Err(DecodeError::FrameSizeMismatch {
                expected: (width, height),
                actual: (frame.width, frame.height),
            });
        }
        Ok(Self {
            width,
            height,
            frames,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn first_frame(&self) -> &Frame {
        // never empty, checked in new
        &self.frames[0]
    }

    pub fn total_duration(&self) -> Duration {
        self.frames.iter().map(Frame::delay).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, delay_ms: u64) -> Frame {
        Frame::new(
            width,
            height,
            vec![0; (width * height * 4) as usize],
            Duration::from_millis(delay_ms),
        )
    }

    #[test]
    fn rejects_empty_and_mismatched() {
        assert_eq!(
            AnimatedImage::new(2, 2, vec![]),
            Err(DecodeError::NoFrames)
        );
        assert_eq!(
            AnimatedImage::new(2, 2, vec![frame(2, 2, 0), frame(1, 2, 0)]),
            Err(DecodeError::FrameSizeMismatch {
                expected: (2, 2),
                actual: (1, 2)
            })
        );
    }

    #[test]
    fn total_duration_sums_delays() {
        let animation =
            AnimatedImage::new(1, 1, vec![frame(1, 1, 100), frame(1, 1, 250)]).unwrap();
        assert_eq!(animation.total_duration(), Duration::from_millis(350));
        assert_eq!(animation.first_frame().delay_seconds(), 0.1);
    }
}

use std::path::Path;

use bytes::Bytes;
use tracing::info;

use crate::common::{PixelFormat, RawFrame};
use crate::error::AppError;

/// Source of raw sensor buffers.
pub trait CameraSource: Send {
    /// Latest buffer, or `None` when the sensor has nothing ready.
    fn try_acquire_frame(&mut self) -> Option<RawFrame>;
}

impl<C: CameraSource + ?Sized> CameraSource for Box<C> {
    fn try_acquire_frame(&mut self) -> Option<RawFrame> {
        (**self).try_acquire_frame()
    }
}

/// Serves one still image as if it were the latest sensor buffer.
pub struct StillImageCamera {
    width: u32,
    height: u32,
    data: Bytes,
}

impl StillImageCamera {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        info!("Camera serving {} ({}x{})", path.display(), width, height);
        Ok(Self {
            width,
            height,
            data: Bytes::from(image.into_raw()),
        })
    }
}

impl CameraSource for StillImageCamera {
    fn try_acquire_frame(&mut self) -> Option<RawFrame> {
        Some(RawFrame::new(
            self.width,
            self.height,
            PixelFormat::Rgba8,
            self.data.clone(),
        ))
    }
}

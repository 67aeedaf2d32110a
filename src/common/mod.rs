pub mod frame;
pub mod normalized_image;
pub mod orientation;

pub use frame::{PixelFormat, RawFrame};
pub use normalized_image::NormalizedImage;
pub use orientation::{Orientation, Rotation};

pub mod convert;
pub mod normalizer;
pub mod rotate;
pub mod service;

pub use normalizer::normalize;
pub use service::{CapturedFrame, ImageNormalizer, NormalizeRequest};

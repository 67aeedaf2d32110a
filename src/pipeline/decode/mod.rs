pub mod animation;
pub mod decoder;
pub mod service;

pub use animation::{AnimatedImage, Frame};
pub use decoder::decode_animation;
pub use service::AnimationDecoder;

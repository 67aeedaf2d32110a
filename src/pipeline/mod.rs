pub mod decode;
pub mod normalize;
pub mod orchestrator;
pub mod session;

pub use decode::{AnimatedImage, AnimationDecoder, Frame};
pub use normalize::{CapturedFrame, ImageNormalizer, NormalizeRequest};
pub use orchestrator::{QueryOrchestrator, RequestPolicy};
pub use session::{Effect, PipelineSession, SessionEvent, SessionOutcome, SessionState, Stage};

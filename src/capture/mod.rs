pub mod camera;
pub mod gate;
pub mod sampler;

pub use camera::{CameraSource, StillImageCamera};
pub use gate::{SessionGate, SessionPermit};
pub use sampler::{CaptureTicket, FrameSampler, TickOutcome};

pub mod machine;
pub mod metrics;
pub mod state;

pub use machine::PipelineSession;
pub use metrics::SessionMetrics;
pub use state::{Effect, SessionEvent, SessionOutcome, SessionState, Stage};

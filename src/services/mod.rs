pub mod compute;
pub mod presenter;
pub mod vision;

pub use compute::{ComputeClient, WolframComputeClient};
pub use presenter::{BroadcastPresenter, ResultPresenter};
pub use vision::{OpenAiVisionClient, QueryRequest, Recognition, VisionClient};

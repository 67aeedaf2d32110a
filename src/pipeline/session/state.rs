use std::fmt;

use bytes::Bytes;

use crate::error::{ConversionError, DecodeError, NetworkError, PipelineError};
use crate::pipeline::decode::AnimatedImage;
use crate::pipeline::normalize::{CapturedFrame, NormalizeRequest};
use crate::services::QueryRequest;

/// States a session moves through. The failure and success states are
/// terminal: the session records its outcome there and drops back to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    ConversionFailed,
    AwaitingVision,
    ResponseParseFailed,
    NoFormula,
    VisionFailed,
    FormulaDetected(String),
    AwaitingCompute,
    ComputeFailed,
    ComputeSucceeded,
}

/// Pipeline stage a failure originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Vision,
    Compute,
    Decode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Capture => "capture",
            Stage::Vision => "vision",
            Stage::Compute => "compute",
            Stage::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Results fed back into the session once an effect has run.
#[derive(Debug)]
pub enum SessionEvent {
    Captured(Result<CapturedFrame, ConversionError>),
    VisionResponded(Result<String, NetworkError>),
    ComputeResponded(Result<Bytes, NetworkError>),
    Decoded(Result<AnimatedImage, DecodeError>),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Captured(_) => "Captured",
            SessionEvent::VisionResponded(_) => "VisionResponded",
            SessionEvent::ComputeResponded(_) => "ComputeResponded",
            SessionEvent::Decoded(_) => "Decoded",
        }
    }
}

/// Work the session asks its driver to perform next.
#[derive(Debug)]
pub enum Effect {
    Normalize(NormalizeRequest),
    QueryVision(QueryRequest),
    QueryCompute(String),
    Decode(Bytes),
    Present(AnimatedImage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    NoFormula,
    Delivered { frames: usize },
    Failed { stage: Stage, error: PipelineError },
}

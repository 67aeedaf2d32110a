use std::time::Duration;
use thiserror::Error;

use crate::common::PixelFormat;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
    #[error("Presenter error: {0}")]
    Presenter(String),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Failure while turning a raw sensor buffer into a query-ready image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),
    #[error("Buffer too short for {format:?}: expected {expected} bytes, got {actual}")]
    BufferTooShort {
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
    #[error("Converted buffer holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Failed to encode JPEG payload: {0}")]
    Encode(String),
    #[error("Conversion worker failed: {0}")]
    Worker(String),
}

// Transport level failures, timeouts included
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Service responded with status {status}")]
    Status { status: u16 },
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl NetworkError {
    /// A 4xx other than 429 fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Transport(_) | NetworkError::Timeout(_) => true,
            NetworkError::Status { status } => *status >= 500 || *status == 429,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => NetworkError::Status {
                status: status.as_u16(),
            },
            None => NetworkError::Transport(error.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseParseError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Response has no choices[0].message.content")]
    MissingContent,
    #[error("Response content is empty")]
    EmptyContent,
}

/// Failure to turn a compute payload into an animation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Logical screen has zero size ({width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Malformed GIF stream: {0}")]
    Malformed(String),
    #[error("GIF exceeds decode limits: {0}")]
    TooLarge(String),
    #[error("Stream contains no frames")]
    NoFrames,
    #[error("Frame is {actual:?}, container is {expected:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Decode worker failed: {0}")]
    Worker(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Limits(e) => DecodeError::TooLarge(e.to_string()),
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Acquisition,
    Conversion,
    Network,
    ResponseParse,
    NoFormula,
    Decode,
    Timeout,
}

/// Any failure that ends a session before a result is presented.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    ResponseParse(#[from] ResponseParseError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Conversion(_) => FailureKind::Conversion,
            PipelineError::Network(NetworkError::Timeout(_)) => FailureKind::Timeout,
            PipelineError::Network(_) => FailureKind::Network,
            PipelineError::ResponseParse(_) => FailureKind::ResponseParse,
            PipelineError::Decode(_) => FailureKind::Decode,
        }
    }

    /// Only network failures that may clear up on their own are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Network(error) => error.is_transient(),
            _ => false,
        }
    }
}

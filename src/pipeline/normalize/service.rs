use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use super::normalizer::normalize;
use crate::common::{NormalizedImage, Orientation, RawFrame};
use crate::error::ConversionError;
use crate::services::vision::QueryRequest;

#[derive(Debug)]
pub struct NormalizeRequest {
    pub frame: RawFrame,
    pub orientation: Orientation,
}

/// A normalized frame together with the vision query built from it.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: NormalizedImage,
    pub request: QueryRequest,
}

/// Normalizes raw frames and encodes the vision payload on a blocking worker.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    prompt: Arc<str>,
    jpeg_quality: u8,
}

impl ImageNormalizer {
    pub fn new(prompt: impl Into<Arc<str>>, jpeg_quality: u8) -> Self {
        Self {
            prompt: prompt.into(),
            jpeg_quality,
        }
    }
}

impl Service<NormalizeRequest> for ImageNormalizer {
    type Response = CapturedFrame;
    type Error = ConversionError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: NormalizeRequest) -> Self::Future {
        let prompt = self.prompt.clone();
        let quality = self.jpeg_quality;
        Box::pin(async move {
            tokio::task::spawn_blocking(move || -> Result<CapturedFrame, ConversionError> {
                let image = normalize(request.frame, request.orientation)?;
                let request = QueryRequest::from_image(&prompt, &image, quality)?;
                Ok(CapturedFrame { image, request })
            })
            .await
            .map_err(|e| ConversionError::Worker(e.to_string()))?
        })
    }
}

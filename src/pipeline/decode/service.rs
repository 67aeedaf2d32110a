use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::Service;
use tracing::debug;

use super::animation::AnimatedImage;
use super::decoder::decode_animation;
use crate::error::DecodeError;

/// Decodes compute-service payloads off the async runtime.
#[derive(Debug, Clone, Default)]
pub struct AnimationDecoder;

impl AnimationDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Service<Bytes> for AnimationDecoder {
    type Response = AnimatedImage;
    type Error = DecodeError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, payload: Bytes) -> Self::Future {
        Box::pin(async move {
            let len = payload.len();
            let animation = tokio::task::spawn_blocking(move || decode_animation(&payload))
                .await
                .map_err(|e| DecodeError::Worker(e.to_string()))??;
            debug!(
                "Decoded {} bytes into {} frames of {}x{}",
                len,
                animation.frames().len(),
                animation.width(),
                animation.height()
            );
            Ok::<_, DecodeError>(animation)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[tokio::test]
    async fn decodes_on_worker() {
        let gif: &[u8] = &[
            b'G', b'I', b'F', b'8', b'9', b'a', 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00,
            0xFF, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
            0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
        ];
        let animation = AnimationDecoder::new()
            .oneshot(Bytes::from_static(gif))
            .await
            .unwrap();
        assert_eq!(animation.first_frame().pixel(0, 0), Some([0, 0xFF, 0, 0xFF]));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let result = AnimationDecoder::new()
            .oneshot(Bytes::from_static(b"<html>busy</html>"))
            .await;
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }
}

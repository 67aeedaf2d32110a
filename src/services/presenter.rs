use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::AppError;
use crate::pipeline::decode::AnimatedImage;

/// Display sink for decoded results.
pub trait ResultPresenter: Send + Sync {
    fn present(&self, animation: AnimatedImage) -> Result<(), AppError>;
}

/// Publishes results to any number of display subscribers.
#[derive(Clone)]
pub struct BroadcastPresenter {
    result_tx: broadcast::Sender<Arc<AnimatedImage>>,
}

impl BroadcastPresenter {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<Arc<AnimatedImage>>) {
        let (result_tx, result_rx) = broadcast::channel(capacity);
        (Self { result_tx }, result_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AnimatedImage>> {
        self.result_tx.subscribe()
    }
}

impl ResultPresenter for BroadcastPresenter {
    fn present(&self, animation: AnimatedImage) -> Result<(), AppError> {
        let frames = animation.frames().len();
        let receivers = self
            .result_tx
            .send(Arc::new(animation))
            .map_err(|_| AppError::Presenter("no display subscribed".to_string()))?;
        debug!("Presented {} frames to {} subscribers", frames, receivers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::Frame;
    use std::time::Duration;

    fn animation() -> AnimatedImage {
        let frame = Frame::new(1, 1, vec![1, 2, 3, 255], Duration::from_millis(50));
        AnimatedImage::new(1, 1, vec![frame]).unwrap()
    }

    #[tokio::test]
    async fn subscribers_receive_results() {
        let (presenter, mut result_rx) = BroadcastPresenter::new(4);
        let mut late_rx = presenter.subscribe();

        presenter.present(animation()).unwrap();

        let received = result_rx.recv().await.unwrap();
        assert_eq!(received.first_frame().pixel(0, 0), Some([1, 2, 3, 255]));
        assert!(Arc::ptr_eq(&received, &late_rx.recv().await.unwrap()));
    }

    #[test]
    fn presenting_without_subscribers_is_an_error() {
        let (presenter, result_rx) = BroadcastPresenter::new(1);
        drop(result_rx);
        assert!(matches!(
            presenter.present(animation()),
            Err(AppError::Presenter(_))
        ));
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    capture::{CameraSource, CaptureTicket, FrameSampler, TickOutcome},
    common::Orientation,
    config::Configuration,
    error::AppError,
    pipeline::{ImageNormalizer, QueryOrchestrator, RequestPolicy},
    services::{ComputeClient, ResultPresenter, VisionClient},
};

/// Owns the sampler and orchestrator tasks for one run.
pub struct Coordinator {
    sampler_task: Option<JoinHandle<()>>,
    orchestrator_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    orientation_tx: watch::Sender<Orientation>,
}

impl Coordinator {
    fn new(
        configuration: Configuration,
        interval: Duration,
        camera: Box<dyn CameraSource>,
        orchestrator: QueryOrchestrator,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let (orientation_tx, orientation_rx) = watch::channel(configuration.capture.orientation);
        // one ticket in flight at most; a busy orchestrator means dropped ticks
        let (capture_tx, capture_rx) = mpsc::channel(1);

        let sampler = FrameSampler::new(camera, orchestrator.gate(), orientation_rx);
        let sampler_task = Self::start_sampler_task(
            sampler,
            interval,
            capture_tx,
            cancel_token.clone(),
        );
        let orchestrator_task = tokio::spawn(orchestrator.start_processing(capture_rx));

        Self {
            sampler_task: Some(sampler_task),
            orchestrator_task: Some(orchestrator_task),
            cancel_token,
            orientation_tx,
        }
    }

    fn start_sampler_task(
        mut sampler: FrameSampler<Box<dyn CameraSource>>,
        interval: Duration,
        capture_tx: mpsc::Sender<CaptureTicket>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Sampling every {:?}", interval);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let TickOutcome::Captured(ticket) = sampler.tick() else {
                            continue;
                        };
                        match capture_tx.try_send(ticket) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(ticket)) => {
                                warn!("Orchestrator backlog full, dropping frame {}", ticket.frame.id);
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                warn!("Orchestrator stopped, ending sampler");
                                break;
                            }
                        }
                    }
                }
            }
            info!("Sampler stopped");
        })
    }

    /// Publishes a new device orientation; the next capture uses it.
    pub fn set_orientation(&self, orientation: Orientation) {
        self.orientation_tx.send_replace(orientation);
    }

    /// Stops sampling. A session already in flight still runs to completion.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    pub async fn join(mut self) {
        for task in [self.sampler_task.take(), self.orchestrator_task.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = task.await {
                warn!("Task ended abnormally: {}", e);
            }
        }
    }

    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    camera: Option<Box<dyn CameraSource>>,
    vision: Option<Arc<dyn VisionClient>>,
    compute: Option<Arc<dyn ComputeClient>>,
    presenter: Option<Arc<dyn ResultPresenter>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            camera: None,
            vision: None,
            compute: None,
            presenter: None,
        }
    }

    // Sets the capture interval, this will override the configuration.
    pub fn capture_interval_secs(mut self, interval_secs: f64) -> Self {
        self.configuration.capture.interval_secs = interval_secs;
        self
    }

    // Sets the starting orientation, this will override the configuration.
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.configuration.capture.orientation = orientation;
        self
    }

    // Sets the per-request timeout, this will override the configuration.
    pub fn request_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.configuration.network.request_timeout_secs = timeout_secs;
        self
    }

    pub fn camera(mut self, camera: impl CameraSource + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn vision_client(mut self, vision: Arc<dyn VisionClient>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn compute_client(mut self, compute: Arc<dyn ComputeClient>) -> Self {
        self.compute = Some(compute);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn ResultPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Spawns the tasks; must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        let interval = self.configuration.capture_interval()?;
        let camera = self
            .camera
            .ok_or_else(|| AppError::InvalidConfig("Camera not set".to_string()))?;
        let vision = self
            .vision
            .ok_or_else(|| AppError::InvalidConfig("Vision client not set".to_string()))?;
        let compute = self
            .compute
            .ok_or_else(|| AppError::InvalidConfig("Compute client not set".to_string()))?;
        let presenter = self
            .presenter
            .ok_or_else(|| AppError::InvalidConfig("Presenter not set".to_string()))?;

        let orchestrator = QueryOrchestrator::new(
            vision,
            compute,
            presenter,
            ImageNormalizer::new(
                self.configuration.vision.prompt.as_str(),
                self.configuration.capture.jpeg_quality,
            ),
            RequestPolicy::from(&self.configuration.network),
        );
        Ok(Coordinator::new(self.configuration, interval, camera, orchestrator))
    }
}

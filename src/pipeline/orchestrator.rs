use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use super::decode::AnimationDecoder;
use super::normalize::ImageNormalizer;
use super::session::{Effect, PipelineSession, SessionEvent, SessionOutcome, Stage};
use crate::capture::{CaptureTicket, SessionGate};
use crate::config::NetworkSettings;
use crate::error::NetworkError;
use crate::services::{ComputeClient, ResultPresenter, VisionClient};

/// Timeout and retry behaviour for outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self::from(&NetworkSettings::default())
    }
}

impl From<&NetworkSettings> for RequestPolicy {
    fn from(settings: &NetworkSettings) -> Self {
        Self {
            timeout: settings.request_timeout(),
            max_retries: settings.max_retries,
            backoff: settings.retry_backoff(),
        }
    }
}

impl RequestPolicy {
    /// Exponential backoff with up to 50% random jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff.as_millis() as u64;
        let scaled = base.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
        let jitter = if base > 1 {
            rand::rng().random_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(scaled.saturating_add(jitter))
    }
}

/// Drives pipeline sessions one at a time.
///
/// Owns the session gate: a ticket's permit is held until its session has
/// returned to idle, so the sampler sees the orchestrator as active for the
/// whole round trip.
pub struct QueryOrchestrator {
    vision: Arc<dyn VisionClient>,
    compute: Arc<dyn ComputeClient>,
    presenter: Arc<dyn ResultPresenter>,
    normalizer: ImageNormalizer,
    decoder: AnimationDecoder,
    gate: SessionGate,
    policy: RequestPolicy,
}

impl QueryOrchestrator {
    pub fn new(
        vision: Arc<dyn VisionClient>,
        compute: Arc<dyn ComputeClient>,
        presenter: Arc<dyn ResultPresenter>,
        normalizer: ImageNormalizer,
        policy: RequestPolicy,
    ) -> Self {
        Self {
            vision,
            compute,
            presenter,
            normalizer,
            decoder: AnimationDecoder::new(),
            gate: SessionGate::new(),
            policy,
        }
    }

    /// Handle for the sampler to check and claim.
    pub fn gate(&self) -> SessionGate {
        self.gate.clone()
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Runs one session to completion and releases the ticket's permit.
    pub async fn run_session(&self, ticket: CaptureTicket) -> Option<SessionOutcome> {
        let CaptureTicket {
            permit,
            frame,
            orientation,
        } = ticket;

        let mut session = PipelineSession::new();
        info!("Session {} started for frame {}", session.id(), frame.id);
        let mut next = session.begin(frame, orientation);

        while let Some(effect) = next.take() {
            next = match effect {
                Effect::Normalize(request) => {
                    let result = self.normalizer.clone().oneshot(request).await;
                    session.step(SessionEvent::Captured(result))
                }
                Effect::QueryVision(request) => {
                    let vision = &self.vision;
                    let request = &request;
                    let result = self
                        .request(Stage::Vision, || vision.recognize(request))
                        .await;
                    session.step(SessionEvent::VisionResponded(result))
                }
                Effect::QueryCompute(formula) => {
                    let compute = &self.compute;
                    let formula = formula.as_str();
                    let result = self
                        .request(Stage::Compute, || compute.compute(formula))
                        .await;
                    session.step(SessionEvent::ComputeResponded(result))
                }
                Effect::Decode(payload) => {
                    let result = self.decoder.clone().oneshot(payload).await;
                    session.step(SessionEvent::Decoded(result))
                }
                Effect::Present(animation) => {
                    if let Err(e) = self.presenter.present(animation) {
                        error!("Session {} could not present result: {}", session.id(), e);
                    }
                    None
                }
            };
        }

        debug!(
            "Session {} finished after {}us",
            session.id(),
            session.metrics().total_duration_us
        );
        drop(permit);
        session.into_outcome()
    }

    /// Issues a request under the timeout, retrying transient failures.
    async fn request<T, F, Fut>(&self, stage: Stage, mut call: F) -> Result<T, NetworkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(NetworkError::Timeout(self.policy.timeout)),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        stage, e, attempt, self.policy.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Consumes capture tickets until the sender side closes.
    pub async fn start_processing(self, mut capture_rx: mpsc::Receiver<CaptureTicket>) {
        info!("Query orchestrator started - waiting for captures...");

        while let Some(ticket) = capture_rx.recv().await {
            self.run_session(ticket).await;
        }

        info!("Query orchestrator stopped");
    }
}

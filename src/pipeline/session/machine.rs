use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::metrics::SessionMetrics;
use super::state::{Effect, SessionEvent, SessionOutcome, SessionState, Stage};
use crate::common::{NormalizedImage, Orientation, RawFrame};
use crate::error::PipelineError;
use crate::pipeline::normalize::NormalizeRequest;
use crate::services::vision::{parse_recognition, Recognition};

/// One pass from a captured frame to a presented result (or a failure).
///
/// The session never performs I/O itself. `begin` and `step` return the next
/// [`Effect`] for the driver to execute, and the driver feeds the result back
/// as a [`SessionEvent`]. Every state the session enters is kept in `trail`.
#[derive(Debug)]
pub struct PipelineSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SessionState,
    trail: Vec<SessionState>,
    image: Option<NormalizedImage>,
    metrics: SessionMetrics,
    outcome: Option<SessionOutcome>,
    processing_start: Instant,
    stage_start: Instant,
}

impl Default for PipelineSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineSession {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: SessionState::Idle,
            trail: vec![SessionState::Idle],
            image: None,
            metrics: SessionMetrics::new(),
            outcome: None,
            processing_start: now,
            stage_start: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn trail(&self) -> &[SessionState] {
        &self.trail
    }

    pub fn image(&self) -> Option<&NormalizedImage> {
        self.image.as_ref()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Starts the session on a freshly captured frame.
    pub fn begin(&mut self, frame: RawFrame, orientation: Orientation) -> Option<Effect> {
        if self.state != SessionState::Idle || self.outcome.is_some() {
            warn!(
                "Session {} cannot begin in state {:?}, dropping frame {}",
                self.id, self.state, frame.id
            );
            return None;
        }

        debug!("Session {} capturing frame {}", self.id, frame.id);
        self.processing_start = Instant::now();
        self.enter(SessionState::Capturing);
        Some(Effect::Normalize(NormalizeRequest { frame, orientation }))
    }

    pub fn step(&mut self, event: SessionEvent) -> Option<Effect> {
        match event {
            SessionEvent::Captured(result) if self.state == SessionState::Capturing => {
                self.record_stage(Stage::Capture);
                match result {
                    Ok(captured) => {
                        self.image = Some(captured.image);
                        self.enter(SessionState::AwaitingVision);
                        Some(Effect::QueryVision(captured.request))
                    }
                    Err(e) => self.fail(SessionState::ConversionFailed, Stage::Capture, e.into()),
                }
            }
            SessionEvent::VisionResponded(result) if self.state == SessionState::AwaitingVision => {
                self.record_stage(Stage::Vision);
                let body = match result {
                    Ok(body) => body,
                    Err(e) => return self.fail(SessionState::VisionFailed, Stage::Vision, e.into()),
                };
                match parse_recognition(&body) {
                    Ok(Recognition::NoFormula) => {
                        self.finish(SessionState::NoFormula, SessionOutcome::NoFormula);
                        None
                    }
                    Ok(Recognition::Formula(formula)) => {
                        info!("Session {} detected formula: {}", self.id, formula);
                        self.enter(SessionState::FormulaDetected(formula.clone()));
                        self.enter(SessionState::AwaitingCompute);
                        Some(Effect::QueryCompute(formula))
                    }
                    Err(e) => self.fail(SessionState::ResponseParseFailed, Stage::Vision, e.into()),
                }
            }
            SessionEvent::ComputeResponded(result) if self.state == SessionState::AwaitingCompute => {
                self.record_stage(Stage::Compute);
                match result {
                    Ok(payload) => {
                        debug!("Session {} received {} byte result", self.id, payload.len());
                        Some(Effect::Decode(payload))
                    }
                    Err(e) => self.fail(SessionState::ComputeFailed, Stage::Compute, e.into()),
                }
            }
            SessionEvent::Decoded(result) if self.state == SessionState::AwaitingCompute => {
                self.record_stage(Stage::Decode);
                match result {
                    Ok(animation) => {
                        let frames = animation.frames().len();
                        self.finish(
                            SessionState::ComputeSucceeded,
                            SessionOutcome::Delivered { frames },
                        );
                        Some(Effect::Present(animation))
                    }
                    Err(e) => self.fail(SessionState::ComputeFailed, Stage::Decode, e.into()),
                }
            }
            event => {
                warn!(
                    "Session {} ignoring {} in state {:?}",
                    self.id,
                    event.name(),
                    self.state
                );
                None
            }
        }
    }

    fn enter(&mut self, state: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.id, self.state, state);
        self.trail.push(state.clone());
        self.state = state;
        self.stage_start = Instant::now();
    }

    fn record_stage(&mut self, stage: Stage) {
        let elapsed = self.stage_start.elapsed().as_micros() as u64;
        self.metrics.record_duration(stage, elapsed);
        self.stage_start = Instant::now();
    }

    fn fail(&mut self, terminal: SessionState, stage: Stage, error: PipelineError) -> Option<Effect> {
        error!(
            "Session {} failed at {} stage ({:?}): {}",
            self.id,
            stage,
            error.kind(),
            error
        );
        self.finish(terminal, SessionOutcome::Failed { stage, error });
        None
    }

    fn finish(&mut self, terminal: SessionState, outcome: SessionOutcome) {
        self.enter(terminal);
        self.metrics.finalize(self.processing_start);
        match &outcome {
            SessionOutcome::NoFormula => info!("Session {}: no formula in frame", self.id),
            SessionOutcome::Delivered { frames } => info!(
                "Session {} delivered {} frame(s) in {}us",
                self.id, frames, self.metrics.total_duration_us
            ),
            SessionOutcome::Failed { .. } => {}
        }
        self.outcome = Some(outcome);
        self.enter(SessionState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PixelFormat;
    use crate::error::{ConversionError, DecodeError, FailureKind, NetworkError};
    use crate::pipeline::decode::{AnimatedImage, Frame};
    use crate::pipeline::normalize::CapturedFrame;
    use crate::services::QueryRequest;
    use bytes::Bytes;
    use std::time::Duration;

    fn chat_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    fn captured() -> CapturedFrame {
        CapturedFrame {
            image: NormalizedImage::new(1, 1, vec![1, 2, 3, 255]).unwrap(),
            request: QueryRequest {
                prompt: "prompt".to_string(),
                image_base64: "AAAA".to_string(),
            },
        }
    }

    fn started() -> PipelineSession {
        let mut session = PipelineSession::new();
        let frame = RawFrame::new(1, 1, PixelFormat::Rgba8, vec![1u8, 2, 3, 255]);
        let effect = session.begin(frame, Orientation::Portrait);
        assert!(matches!(effect, Some(Effect::Normalize(_))));
        session
    }

    fn awaiting_vision() -> PipelineSession {
        let mut session = started();
        let effect = session.step(SessionEvent::Captured(Ok(captured())));
        assert!(matches!(effect, Some(Effect::QueryVision(_))));
        session
    }

    fn awaiting_compute() -> PipelineSession {
        let mut session = awaiting_vision();
        let effect = session.step(SessionEvent::VisionResponded(Ok(chat_body("x^2"))));
        assert!(matches!(effect, Some(Effect::QueryCompute(ref f)) if f == "x^2"));
        session
    }

    fn failure(session: &PipelineSession) -> (Stage, FailureKind) {
        match session.outcome() {
            Some(SessionOutcome::Failed { stage, error }) => (*stage, error.kind()),
            other => panic!("expected a failure, got {:?}", other),
        }
    }

    #[test]
    fn conversion_failure_returns_to_idle() {
        let mut session = started();
        let effect = session.step(SessionEvent::Captured(Err(ConversionError::EmptyFrame {
            width: 0,
            height: 0,
        })));
        assert!(effect.is_none());
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(failure(&session), (Stage::Capture, FailureKind::Conversion));
        assert!(session.image().is_none());
    }

    #[test]
    fn captured_frame_is_kept_for_the_session() {
        let session = awaiting_vision();
        assert_eq!(session.state(), &SessionState::AwaitingVision);
        assert_eq!(session.image().unwrap().pixel(0, 0), Some([1, 2, 3, 255]));
    }

    #[test]
    fn sentinel_ends_the_session_without_compute() {
        let mut session = awaiting_vision();
        let effect = session.step(SessionEvent::VisionResponded(Ok(chat_body("None"))));
        assert!(effect.is_none());
        assert_eq!(session.outcome(), Some(&SessionOutcome::NoFormula));
        assert_eq!(
            session.trail(),
            &[
                SessionState::Idle,
                SessionState::Capturing,
                SessionState::AwaitingVision,
                SessionState::NoFormula,
                SessionState::Idle,
            ]
        );
    }

    #[test]
    fn vision_failure_never_reaches_compute() {
        let mut session = awaiting_vision();
        let effect = session.step(SessionEvent::VisionResponded(Err(NetworkError::Transport(
            "connection reset".to_string(),
        ))));
        assert!(effect.is_none());
        assert_eq!(failure(&session), (Stage::Vision, FailureKind::Network));
        assert!(session.trail().contains(&SessionState::VisionFailed));
        assert!(!session.trail().contains(&SessionState::AwaitingCompute));
    }

    #[test]
    fn unparseable_body_is_a_response_parse_failure() {
        let mut session = awaiting_vision();
        let effect = session.step(SessionEvent::VisionResponded(Ok(r#"{"choices":[]}"#.to_string())));
        assert!(effect.is_none());
        assert_eq!(failure(&session), (Stage::Vision, FailureKind::ResponseParse));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn formula_moves_to_compute() {
        let session = awaiting_compute();
        assert_eq!(session.state(), &SessionState::AwaitingCompute);
        assert!(session
            .trail()
            .contains(&SessionState::FormulaDetected("x^2".to_string())));
    }

    #[test]
    fn compute_timeout_is_reported_as_timeout() {
        let mut session = awaiting_compute();
        let effect = session.step(SessionEvent::ComputeResponded(Err(NetworkError::Timeout(
            Duration::from_secs(30),
        ))));
        assert!(effect.is_none());
        assert_eq!(failure(&session), (Stage::Compute, FailureKind::Timeout));
        assert!(session.trail().contains(&SessionState::ComputeFailed));
    }

    #[test]
    fn compute_payload_is_decoded_then_presented() {
        let mut session = awaiting_compute();
        let effect = session.step(SessionEvent::ComputeResponded(Ok(Bytes::from_static(b"GIF89a"))));
        assert!(matches!(effect, Some(Effect::Decode(_))));
        assert_eq!(session.state(), &SessionState::AwaitingCompute);

        let animation = AnimatedImage::new(
            1,
            1,
            vec![
                Frame::new(1, 1, vec![0, 0, 0, 255], Duration::from_millis(100)),
                Frame::new(1, 1, vec![9, 9, 9, 255], Duration::from_millis(100)),
            ],
        )
        .unwrap();
        let effect = session.step(SessionEvent::Decoded(Ok(animation)));
        assert!(matches!(effect, Some(Effect::Present(ref a)) if a.frames().len() == 2));
        assert_eq!(session.outcome(), Some(&SessionOutcome::Delivered { frames: 2 }));
        assert_eq!(
            &session.trail()[session.trail().len() - 2..],
            &[SessionState::ComputeSucceeded, SessionState::Idle]
        );
    }

    #[test]
    fn decode_failure_is_a_compute_failure() {
        let mut session = awaiting_compute();
        session.step(SessionEvent::ComputeResponded(Ok(Bytes::from_static(b"junk"))));
        let effect = session.step(SessionEvent::Decoded(Err(DecodeError::NoFrames)));
        assert!(effect.is_none());
        assert_eq!(failure(&session), (Stage::Decode, FailureKind::Decode));
        assert!(session.trail().contains(&SessionState::ComputeFailed));
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut session = awaiting_vision();
        let effect = session.step(SessionEvent::ComputeResponded(Ok(Bytes::new())));
        assert!(effect.is_none());
        assert_eq!(session.state(), &SessionState::AwaitingVision);
        assert!(session.outcome().is_none());

        let mut idle = PipelineSession::new();
        assert!(idle
            .step(SessionEvent::VisionResponded(Ok(chat_body("x"))))
            .is_none());
        assert_eq!(idle.trail(), &[SessionState::Idle]);
    }

    #[test]
    fn finished_session_cannot_begin_again() {
        let mut session = awaiting_vision();
        session.step(SessionEvent::VisionResponded(Ok(chat_body("None"))));
        let frame = RawFrame::new(1, 1, PixelFormat::Gray8, vec![0u8]);
        assert!(session.begin(frame, Orientation::Portrait).is_none());
    }
}

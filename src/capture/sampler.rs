use tokio::sync::watch;
use tracing::{debug, trace};

use super::camera::CameraSource;
use super::gate::{SessionGate, SessionPermit};
use crate::common::{Orientation, RawFrame};

/// Everything a new session needs: the claimed permit, the frame and the
/// orientation it was captured in.
#[derive(Debug)]
pub struct CaptureTicket {
    pub permit: SessionPermit,
    pub frame: RawFrame,
    pub orientation: Orientation,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// A session is in flight, the camera was not touched.
    Busy,
    /// The camera had no buffer ready.
    NotReady,
    Captured(CaptureTicket),
}

/// Turns timer ticks into at most one captured frame each.
pub struct FrameSampler<C: CameraSource> {
    camera: C,
    gate: SessionGate,
    orientation: watch::Receiver<Orientation>,
}

impl<C: CameraSource> FrameSampler<C> {
    pub fn new(camera: C, gate: SessionGate, orientation: watch::Receiver<Orientation>) -> Self {
        Self {
            camera,
            gate,
            orientation,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.gate.is_active() {
            debug!("Session in flight, dropping tick");
            return TickOutcome::Busy;
        }

        let Some(frame) = self.camera.try_acquire_frame() else {
            trace!("Camera not ready");
            return TickOutcome::NotReady;
        };

        // the frame is released here if the claim races with another sampler
        let Some(permit) = self.gate.try_begin() else {
            debug!("Session started concurrently, dropping frame {}", frame.id);
            return TickOutcome::Busy;
        };

        let orientation = *self.orientation.borrow();
        debug!(
            "Captured frame {} ({}x{} {:?}, {:?})",
            frame.id, frame.width, frame.height, frame.format, orientation
        );
        TickOutcome::Captured(CaptureTicket {
            permit,
            frame,
            orientation,
        })
    }
}

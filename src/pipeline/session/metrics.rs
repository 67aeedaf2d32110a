use std::time::Instant;

use super::state::Stage;

/// Per-stage timings collected while a session runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    pub capture_duration_us: u64,
    pub vision_duration_us: u64,
    pub compute_duration_us: u64,
    pub decode_duration_us: u64,
    pub total_duration_us: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_duration(&mut self, stage: Stage, duration_us: u64) {
        match stage {
            Stage::Capture => self.capture_duration_us = duration_us,
            Stage::Vision => self.vision_duration_us = duration_us,
            Stage::Compute => self.compute_duration_us = duration_us,
            Stage::Decode => self.decode_duration_us = duration_us,
        }
    }

    pub fn finalize(&mut self, start_time: Instant) {
        self.total_duration_us = start_time.elapsed().as_micros() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_land_in_their_stage() {
        let mut metrics = SessionMetrics::new();
        metrics.record_duration(Stage::Vision, 42);
        metrics.record_duration(Stage::Decode, 7);
        assert_eq!(metrics.vision_duration_us, 42);
        assert_eq!(metrics.decode_duration_us, 7);
        assert_eq!(metrics.compute_duration_us, 0);
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether a pipeline session is in flight.
///
/// Clones share the same flag. The sampler asks `is_active` before every
/// tick; the permit returned by `try_begin` keeps the gate active until it
/// is dropped.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    active: Arc<AtomicBool>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn try_begin(&self) -> Option<SessionPermit> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SessionPermit {
                active: self.active.clone(),
            })
    }
}

/// Held for the lifetime of one session.
#[derive(Debug)]
pub struct SessionPermit {
    active: Arc<AtomicBool>,
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

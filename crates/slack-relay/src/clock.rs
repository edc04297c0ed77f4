//! Clock abstraction so flush timing can be driven deterministically in tests.

use tokio::time::Instant;

/// Source of the current instant.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Delegates to `tokio::time::Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to the code under
/// test and drive it with the other.
#[cfg(test)]
#[derive(Clone)]
pub struct MockClock {
    origin: Instant,
    elapsed: std::sync::Arc<std::sync::Mutex<std::time::Duration>>,
}

#[cfg(test)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Default::default(),
        }
    }

    pub fn advance(&self, by: std::time::Duration) {
        *self.elapsed.lock().unwrap() += by;
    }

    /// Jump to an absolute offset from the clock's creation.
    pub fn set_elapsed(&self, at: std::time::Duration) {
        *self.elapsed.lock().unwrap() = at;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap()
    }
}

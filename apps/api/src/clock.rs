use chrono::{DateTime, Utc};

/// Time source for the run loop and window checks.
///
/// Injected so window-boundary scenarios are testable; production code uses
/// [`SystemClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

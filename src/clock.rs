use chrono::{DateTime, Utc};

/// Source of "now" for reconciliation and change-set computation.
///
/// Injected rather than read ambiently so that `insertion_time`,
/// `last_update_time`, and change-set timestamps are deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

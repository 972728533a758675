//! Shared test utilities for ledger backend testing.
//!
//! Feature-gated behind `testutil` so nothing here leaks into production
//! builds.
//!
//! ```toml
//! [dev-dependencies]
//! medledger-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use crate::{clock::Clock, memory::MemoryBackend};

/// Fixed starting point for [`ManualClock`]: 2018-06-01T00:00:00Z.
pub const EPOCH_SECONDS: i64 = 1_527_811_200;

/// A [`Clock`] that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle while the
/// backend owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Creates a clock frozen at [`EPOCH_SECONDS`].
    #[must_use]
    pub fn at_epoch() -> Self {
        Self::new(Utc.timestamp_opt(EPOCH_SECONDS, 0).single().unwrap_or_default())
    }

    /// Moves the clock forward (or backward, for a negative `delta`).
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Creates a [`MemoryBackend`] driven by a fresh [`ManualClock`], returning both.
#[must_use]
pub fn manual_backend() -> (MemoryBackend, ManualClock) {
    let clock = ManualClock::at_epoch();
    (MemoryBackend::with_clock(clock.clone()), clock)
}

/// Create a [`MemoryBackend`] pre-populated with `count` keys.
///
/// Keys are formatted as `"{prefix}-{idx}"`, each holding the key itself as
/// its value.
///
/// # Panics
///
/// Panics if any write fails (should not happen with `MemoryBackend`).
pub async fn populated_backend(prefix: &str, count: usize) -> MemoryBackend {
    let backend = MemoryBackend::new();
    for idx in 0..count {
        let key = format!("{prefix}-{idx}");
        backend.put(&key, key.clone().into_bytes()).await.expect("populate put failed");
    }
    backend
}

/// Assert that a [`StorageResult`](crate::StorageResult) is a
/// [`StorageError::Conflict`](crate::StorageError::Conflict).
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::StorageError::Conflict { .. })),
            "expected StorageError::Conflict, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::StorageError::Conflict { .. })),
            "{}: expected StorageError::Conflict, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`StorageResult`](crate::StorageResult) is a
/// [`StorageError::NotFound`](crate::StorageError::NotFound).
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::StorageError::NotFound { .. })),
            "expected StorageError::NotFound, got: {:?}",
            $result,
        );
    };
}

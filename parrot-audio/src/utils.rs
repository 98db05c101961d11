//! Shared audio utilities.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since UNIX epoch.
/// Used to name delivered audio files.
#[inline]
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Generate a unique id from the current time in nanoseconds plus a
/// process-wide sequence number. Used for short-lived scratch files.
#[inline]
pub(crate) fn gen_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:x}-{}", nanos, ID_SEQ.fetch_add(1, Ordering::Relaxed))
}

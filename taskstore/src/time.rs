//! Timestamp helpers shared by every record type.

/// Current wall-clock time in Unix milliseconds.
///
/// Centralized so that record constructors never reach for
/// `std::time::SystemTime` directly and so tests can reason about a
/// single source of "now".
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

//! Common timing helpers for runout_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Worst-case detection latency of the debounced strategy in milliseconds:
/// `threshold` consecutive absent ticks at `period_ms` each.
#[inline]
pub fn debounce_latency_ms(threshold: u8, period_ms: u64) -> u64 {
    u64::from(threshold.max(1)).saturating_mul(period_ms.max(1))
}

/// Polling rate in Hz for a given period in milliseconds.
/// - Clamps `period_ms` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 Hz.
#[inline]
pub fn poll_rate_hz(period_ms: u64) -> u64 {
    (MILLIS_PER_SEC / period_ms.max(1)).max(1)
}

use bigdecimal::BigDecimal;
use chrono::{DateTime, SubsecRound, Utc};
use std::str::FromStr;

/// Round to the nearest integer, ties to even (2.5 -> 2, 3.5 -> 4).
pub fn round_half_even(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Exact decimal from the shortest string that round-trips the float,
/// so `3.6` is stored as `3.6` and not its binary expansion.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// Current time at the resolution PostgreSQL keeps for `timestamptz`.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

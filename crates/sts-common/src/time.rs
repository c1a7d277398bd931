//! ---
//! sts_section: "01-core-functionality"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Shared primitives and utilities for the simulator runtime."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use std::time::Instant;

use chrono::Utc;

/// Capture an instant suitable for scheduler comparisons.
pub fn monotonic_now() -> Instant {
    Instant::now()
}

/// Wall-clock milliseconds since the Unix epoch, as stamped into payloads.
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_millis_is_monotonic_enough() {
        let first = unix_millis();
        let second = unix_millis();
        assert!(second >= first);
        // Sanity bound: after 2020-01-01 in milliseconds.
        assert!(first > 1_577_836_800_000);
    }
}

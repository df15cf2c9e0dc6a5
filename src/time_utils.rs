// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date/time helpers shared by filters, analytics and logs.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Midnight UTC of `now`'s day, minus `days_back` days.
pub fn days_ago_midnight(now: DateTime<Utc>, days_back: i64) -> DateTime<Utc> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|m| m.and_utc())
        .unwrap_or(now);
    midnight - Duration::days(days_back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uses_z_suffix() {
        let date = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2026-03-04T05:06:07Z");
    }

    #[test]
    fn test_days_ago_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 17, 30, 0).unwrap();
        assert_eq!(
            days_ago_midnight(now, 0),
            Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap()
        );
        assert_eq!(
            days_ago_midnight(now, 7),
            Utc.with_ymd_and_hms(2026, 2, 25, 0, 0, 0).unwrap()
        );
    }
}

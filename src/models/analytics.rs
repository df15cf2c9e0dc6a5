//! Aggregations behind the analytics view.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Report, ReportStatus};

/// Number of location buckets returned by [`top_locations`].
pub const TOP_LOCATIONS: usize = 10;

/// Window covered by the time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    #[default]
    Month,
    Year,
}

impl Timeframe {
    /// (days covered, bucket width in days)
    fn span(&self) -> (i64, i64) {
        match self {
            Timeframe::Week => (7, 1),
            Timeframe::Month => (30, 1),
            Timeframe::Year => (365, 7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ReportStatus,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    /// Last day of the bucket (YYYY-MM-DD)
    pub date: NaiveDate,
    pub reports: u32,
    pub verified: u32,
    pub resolved: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    /// "lat,lon" rounded to two decimals
    pub location: String,
    pub count: u32,
}

/// Per-status counts, in status order, omitting statuses with no reports.
pub fn status_distribution(reports: &[Report]) -> Vec<StatusCount> {
    ReportStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: reports.iter().filter(|r| r.status == status).count() as u32,
        })
        .filter(|c| c.count > 0)
        .collect()
}

/// Report counts bucketed by creation day, oldest bucket first.
///
/// Buckets end on `now`'s date and step back by the timeframe's bucket
/// width; each bucket covers `width` days ending on its date.
pub fn time_series(reports: &[Report], timeframe: Timeframe, now: DateTime<Utc>) -> Vec<TimeSeriesPoint> {
    let (days, width) = timeframe.span();
    let today = now.date_naive();

    let mut points = Vec::new();
    let mut offset = days;
    while offset >= 0 {
        let end = today - Duration::days(offset);
        let start = end - Duration::days(width - 1);

        let mut point = TimeSeriesPoint {
            date: end,
            reports: 0,
            verified: 0,
            resolved: 0,
        };
        for report in reports {
            let day = report.created_at.date_naive();
            if day < start || day > end {
                continue;
            }
            point.reports += 1;
            match report.status {
                ReportStatus::Verified => point.verified += 1,
                ReportStatus::Resolved => point.resolved += 1,
                _ => {}
            }
        }
        points.push(point);
        offset -= width;
    }
    points
}

/// Most reported locations, busiest first.
pub fn top_locations(reports: &[Report]) -> Vec<LocationCount> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for (lat, lon) in reports.iter().filter_map(Report::coordinates) {
        *counts.entry(format!("{:.2},{:.2}", lat, lon)).or_insert(0) += 1;
    }

    let mut locations: Vec<LocationCount> = counts
        .into_iter()
        .map(|(location, count)| LocationCount { location, count })
        .collect();
    locations.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
    locations.truncate(TOP_LOCATIONS);
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report_at(
        id: u32,
        status: ReportStatus,
        created_at: DateTime<Utc>,
        coords: Option<(f64, f64)>,
    ) -> Report {
        Report {
            id: id.to_string(),
            title: format!("Report {}", id),
            description: "desc".to_string(),
            photo_url: None,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            status,
            owner_id: "u1".to_string(),
            owner_name: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_status_distribution_skips_empty() {
        let reports = vec![
            report_at(1, ReportStatus::Pending, now(), None),
            report_at(2, ReportStatus::Pending, now(), None),
            report_at(3, ReportStatus::Resolved, now(), None),
        ];
        let dist = status_distribution(&reports);
        assert_eq!(
            dist,
            vec![
                StatusCount { status: ReportStatus::Pending, count: 2 },
                StatusCount { status: ReportStatus::Resolved, count: 1 },
            ]
        );
    }

    #[test]
    fn test_week_series_has_eight_daily_buckets() {
        let reports = vec![
            report_at(1, ReportStatus::Verified, now(), None),
            report_at(2, ReportStatus::Pending, now() - Duration::days(2), None),
            report_at(3, ReportStatus::Pending, now() - Duration::days(40), None),
        ];
        let series = time_series(&reports, Timeframe::Week, now());
        assert_eq!(series.len(), 8);
        assert_eq!(series.first().unwrap().date, NaiveDate::from_ymd_opt(2024, 3, 24).unwrap());

        let last = series.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(last.reports, 1);
        assert_eq!(last.verified, 1);

        let total: u32 = series.iter().map(|p| p.reports).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_year_series_weekly_buckets_cover_whole_week() {
        let reports = vec![report_at(1, ReportStatus::Resolved, now() - Duration::days(3), None)];
        let series = time_series(&reports, Timeframe::Year, now());
        let last = series.last().unwrap();
        assert_eq!(last.reports, 1);
        assert_eq!(last.resolved, 1);
    }

    #[test]
    fn test_top_locations_rounds_and_ranks() {
        let reports = vec![
            report_at(1, ReportStatus::Pending, now(), Some((12.971, 77.594))),
            report_at(2, ReportStatus::Pending, now(), Some((12.9712, 77.5938))),
            report_at(3, ReportStatus::Pending, now(), Some((19.076, 72.8777))),
            report_at(4, ReportStatus::Pending, now(), None),
        ];
        let top = top_locations(&reports);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], LocationCount { location: "12.97,77.59".into(), count: 2 });
        assert_eq!(top[1].location, "19.08,72.88");
    }
}

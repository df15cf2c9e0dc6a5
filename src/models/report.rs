//! Incident report model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time_utils::days_ago_midnight;

/// Review status of a report.
///
/// Intended flow is pending -> verified/rejected, verified -> resolved,
/// but any status may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Pending,
        ReportStatus::Verified,
        ReportStatus::Rejected,
        ReportStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown report status '{}'", s))
    }
}

/// An incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ReportStatus,
    /// Owning identity (`user_id` column)
    #[serde(rename = "user_id")]
    pub owner_id: String,
    /// Owner's display name, when the profile was looked up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// Both coordinates, when the report was geotagged.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Case-insensitive substring match over title and description
    /// (and the owner name when `include_owner` is set).
    pub fn matches_search(&self, term: &str, include_owner: bool) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || (include_owner
                && self
                    .owner_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&term)))
    }
}

/// Payload for creating a report (insert body for the `reports` table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub status: ReportStatus,
}

/// Creation-date window used by list filters, counted from midnight UTC today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateWindow {
    Today,
    Week,
    Month,
}

impl DateWindow {
    /// Earliest creation time admitted by the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days_back = match self {
            DateWindow::Today => 0,
            DateWindow::Week => 7,
            DateWindow::Month => 30,
        };
        days_ago_midnight(now, days_back)
    }
}

/// Filters applied to report lists. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub search: Option<String>,
    pub search_owner: bool,
    pub window: Option<DateWindow>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != report.status) {
            return false;
        }
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            if !report.matches_search(term, self.search_owner) {
                return false;
            }
        }
        if let Some(window) = self.window {
            if report.created_at < window.cutoff(now) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, reports: Vec<Report>, now: DateTime<Utc>) -> Vec<Report> {
        reports
            .into_iter()
            .filter(|r| self.matches(r, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_status_and_window() {
        let now = Utc::now();
        let mut old = report("Old", "d", None);
        old.created_at = now - chrono::Duration::days(10);
        let mut verified = report("New", "d", None);
        verified.status = ReportStatus::Verified;

        let filter = ReportFilter {
            window: Some(DateWindow::Week),
            ..Default::default()
        };
        let kept = filter.apply(vec![old.clone(), verified.clone()], now);
        assert_eq!(kept, vec![verified.clone()]);

        let filter = ReportFilter {
            status: Some(ReportStatus::Pending),
            ..Default::default()
        };
        assert_eq!(filter.apply(vec![old.clone(), verified], now), vec![old]);
    }

    fn report(title: &str, description: &str, owner_name: Option<&str>) -> Report {
        let now = Utc::now();
        Report {
            id: "1".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            photo_url: None,
            latitude: Some(1.0),
            longitude: None,
            status: ReportStatus::Pending,
            owner_id: "u1".to_string(),
            owner_name: owner_name.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("verified".parse(), Ok(ReportStatus::Verified));
        assert!("Verified".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let r = report("Oil Spill", "Near the estuary", Some("Asha Rao"));
        assert!(r.matches_search("oil", false));
        assert!(r.matches_search("ESTUARY", false));
        assert!(!r.matches_search("asha", false));
        assert!(r.matches_search("asha", true));
    }

    #[test]
    fn test_coordinates_need_both() {
        let r = report("t", "d", None);
        assert_eq!(r.coordinates(), None);
    }

    #[test]
    fn test_deserialize_remote_row() {
        let row = r#"{
            "id": "7", "title": "t", "description": "d", "photo_url": null,
            "latitude": 12.5, "longitude": 77.1, "status": "resolved",
            "user_id": "abc",
            "created_at": "2024-01-15T10:30:00.123456+00:00",
            "updated_at": "2024-01-15T10:30:00+00:00"
        }"#;
        let r: Report = serde_json::from_str(row).unwrap();
        assert_eq!(r.status, ReportStatus::Resolved);
        assert_eq!(r.owner_id, "abc");
        assert_eq!(r.coordinates(), Some((12.5, 77.1)));
    }
}

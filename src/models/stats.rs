//! Report count aggregates for dashboards.
//!
//! Derived, never stored: recomputed from the report collection on demand.

use serde::{Deserialize, Serialize};

use crate::models::{Report, ReportStatus};

/// Counts of reports by status plus the number of known profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_reports: u32,
    pub pending_reports: u32,
    pub verified_reports: u32,
    pub rejected_reports: u32,
    pub resolved_reports: u32,
    pub total_users: u32,
}

impl ReportStats {
    /// Count reports by status. `total_users` is left at zero.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a Report>) -> Self {
        Self::from_statuses(reports.into_iter().map(|r| r.status))
    }

    fn from_statuses(statuses: impl IntoIterator<Item = ReportStatus>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.record(status);
        }
        stats
    }

    fn record(&mut self, status: ReportStatus) {
        self.total_reports += 1;
        match status {
            ReportStatus::Pending => self.pending_reports += 1,
            ReportStatus::Verified => self.verified_reports += 1,
            ReportStatus::Rejected => self.rejected_reports += 1,
            ReportStatus::Resolved => self.resolved_reports += 1,
        }
    }

    /// Set the profile count.
    pub fn with_users(mut self, total_users: u32) -> Self {
        self.total_users = total_users;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_each_status() {
        use ReportStatus::*;
        let stats = ReportStats::from_statuses([Pending, Pending, Verified, Rejected, Resolved]);
        assert_eq!(stats.total_reports, 5);
        assert_eq!(stats.pending_reports, 2);
        assert_eq!(stats.verified_reports, 1);
        assert_eq!(stats.rejected_reports, 1);
        assert_eq!(stats.resolved_reports, 1);
        assert_eq!(stats.total_users, 0);
    }

    #[test]
    fn test_empty() {
        let stats = ReportStats::from_statuses([]).with_users(3);
        assert_eq!(stats.total_reports, 0);
        assert_eq!(stats.total_users, 3);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory stand-in data used when the backend is empty or unreachable.
//!
//! Seeds five sample reports on first access. State is per process and
//! is never persisted or reconciled with the backend.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{NewReport, Profile, Report, ReportStats, ReportStatus, Role};

/// Owner of the seeded sample reports. Every caller sees these.
pub const SAMPLE_OWNER_ID: &str = "test-user";

/// Display name used for the fallback profile and seeded reports.
pub const SAMPLE_OWNER_NAME: &str = "Admin User";

/// Points carried by the fallback profile.
const FALLBACK_PROFILE_POINTS: u32 = 100;

/// (title, description, latitude, longitude)
const SAMPLE_REPORTS: [(&str, &str, f64, f64); 5] = [
    (
        "Mangrove Deforestation",
        "Large area of mangroves being cleared for development",
        12.9716,
        77.5946,
    ),
    (
        "Oil Spill in Coastal Area",
        "Oil spill affecting marine life and mangroves",
        13.0827,
        80.2707,
    ),
    (
        "Plastic Pollution",
        "Heavy plastic waste accumulation in mangrove area",
        19.0760,
        72.8777,
    ),
    (
        "Illegal Fishing",
        "Commercial fishing vessels in protected mangrove zone",
        22.5726,
        88.3639,
    ),
    (
        "Water Pollution",
        "Industrial waste being discharged near mangrove forest",
        17.3850,
        78.4867,
    ),
];

#[derive(Default)]
struct FallbackData {
    /// Most recent first
    reports: Vec<Report>,
    profiles: HashMap<String, Profile>,
    /// Last id handed out, so ids stay unique within one millisecond
    last_id: i64,
}

/// In-memory data store shared by every session of the process.
pub struct FallbackStore {
    data: Mutex<FallbackData>,
    serve_profiles: bool,
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FallbackStore {
    /// `serve_profiles` controls whether [`FallbackStore::get_profile`] answers.
    pub fn new(serve_profiles: bool) -> Self {
        Self {
            data: Mutex::new(FallbackData::default()),
            serve_profiles,
        }
    }

    /// Lock and seed. Every operation goes through here.
    fn data(&self) -> MutexGuard<'_, FallbackData> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if data.reports.is_empty() {
            seed(&mut data.reports, Utc::now());
            tracing::info!(count = data.reports.len(), "Seeded fallback reports");
        }
        data
    }

    /// Seed the sample reports if the collection is empty. Idempotent.
    pub fn initialize(&self) {
        drop(self.data());
    }

    pub fn list_all_reports(&self) -> Vec<Report> {
        self.data().reports.clone()
    }

    /// Reports owned by `owner_id`, plus the seeded samples.
    pub fn list_reports_for(&self, owner_id: &str) -> Vec<Report> {
        self.data()
            .reports
            .iter()
            .filter(|r| r.owner_id == owner_id || r.owner_id == SAMPLE_OWNER_ID)
            .cloned()
            .collect()
    }

    /// Counts by status; `total_users` is the profile count, at least 1.
    pub fn compute_stats(&self) -> ReportStats {
        let data = self.data();
        ReportStats::from_reports(&data.reports).with_users(data.profiles.len().max(1) as u32)
    }

    /// Store a new report at the head of the collection.
    pub fn create_report(&self, new: NewReport) -> Report {
        let now = Utc::now();
        let mut data = self.data();

        let id = now.timestamp_millis().max(data.last_id + 1);
        data.last_id = id;

        let owner_name = data
            .profiles
            .get(&new.owner_id)
            .and_then(|p| p.full_name.clone());

        let report = Report {
            id: id.to_string(),
            title: new.title,
            description: new.description,
            photo_url: new.photo_url,
            latitude: new.latitude,
            longitude: new.longitude,
            status: new.status,
            owner_id: new.owner_id,
            owner_name,
            created_at: now,
            updated_at: now,
        };
        data.reports.insert(0, report.clone());
        report
    }

    /// Set a report's status. Returns the updated report, `None` if unknown.
    pub fn update_report_status(&self, id: &str, status: ReportStatus) -> Option<Report> {
        let mut data = self.data();
        let report = data.reports.iter_mut().find(|r| r.id == id)?;
        report.status = status;
        report.updated_at = Utc::now();
        Some(report.clone())
    }

    /// Owner edit of a pending report.
    pub fn edit_report(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Report, EditError> {
        let mut data = self.data();
        let report = data
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(EditError::NotFound)?;
        if report.owner_id != owner_id {
            return Err(EditError::NotOwner);
        }
        if report.status != ReportStatus::Pending {
            return Err(EditError::NotPending(report.status));
        }
        report.title = title.to_string();
        report.description = description.to_string();
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    /// Insert a community profile unless one exists for `id`.
    pub fn upsert_profile(&self, id: &str, full_name: Option<&str>) {
        let mut data = self.data();
        data.profiles.entry(id.to_string()).or_insert_with(|| {
            let mut profile = Profile::new(
                id,
                Some(full_name.unwrap_or("User").to_string()),
                Role::Community,
            );
            let now = Utc::now();
            profile.created_at = Some(now);
            profile.updated_at = Some(now);
            profile
        });
    }

    /// Synchronous profile getter.
    ///
    /// Ignores the stored profiles and answers every id with an authority
    /// profile, so in fallback mode every signed-in visitor can review
    /// reports. Returns `None` when profile serving is disabled.
    pub fn get_profile(&self, id: &str) -> Option<Profile> {
        if !self.serve_profiles {
            return None;
        }
        self.initialize();

        let now = Utc::now();
        Some(Profile {
            id: id.to_string(),
            full_name: Some(SAMPLE_OWNER_NAME.to_string()),
            role: Role::Authority,
            points: FALLBACK_PROFILE_POINTS,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }
}

/// Why an owner edit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("report not found")]
    NotFound,
    #[error("only the owner may edit a report")]
    NotOwner,
    #[error("report is {0}, only pending reports can be edited")]
    NotPending(ReportStatus),
}

fn seed(reports: &mut Vec<Report>, now: DateTime<Utc>) {
    reports.extend(SAMPLE_REPORTS.iter().enumerate().map(
        |(i, (title, description, latitude, longitude))| Report {
            id: (i + 1).to_string(),
            title: title.to_string(),
            description: description.to_string(),
            photo_url: None,
            latitude: Some(*latitude),
            longitude: Some(*longitude),
            status: ReportStatus::Pending,
            owner_id: SAMPLE_OWNER_ID.to_string(),
            owner_name: Some(SAMPLE_OWNER_NAME.to_string()),
            created_at: now,
            updated_at: now,
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_report(owner: &str, title: &str) -> NewReport {
        NewReport {
            title: title.to_string(),
            description: "Something is wrong here".to_string(),
            photo_url: None,
            latitude: Some(10.0),
            longitude: Some(76.0),
            owner_id: owner.to_string(),
            status: ReportStatus::Pending,
        }
    }

    #[test]
    fn test_fresh_store_seeds_five_pending() {
        let store = FallbackStore::default();
        let stats = store.compute_stats();
        assert_eq!(stats.total_reports, 5);
        assert_eq!(stats.pending_reports, 5);
        assert_eq!(stats.verified_reports, 0);
        assert_eq!(stats.total_users, 1);
        assert!(store
            .list_all_reports()
            .iter()
            .all(|r| r.owner_id == SAMPLE_OWNER_ID));
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let store = FallbackStore::default();
        store.initialize();
        store.initialize();
        assert_eq!(store.list_all_reports().len(), 5);
    }

    #[test]
    fn test_create_report_is_listed_first_for_owner() {
        let store = FallbackStore::default();
        let first = store.create_report(new_report("u1", "First"));
        let second = store.create_report(new_report("u1", "Second"));
        store.create_report(new_report("u2", "Other"));

        assert_ne!(first.id, second.id);
        let mine = store.list_reports_for("u1");
        assert_eq!(mine[0].id, second.id);
        assert_eq!(mine[1].id, first.id);
        // Two own reports plus the five samples, never another user's.
        assert_eq!(mine.len(), 7);
        assert!(mine.iter().all(|r| r.owner_id != "u2"));
    }

    #[test]
    fn test_ids_strictly_increase() {
        let store = FallbackStore::default();
        let ids: Vec<i64> = (0..20)
            .map(|i| store.create_report(new_report("u1", &format!("r{}", i))).id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_verify_moves_one_from_pending() {
        let store = FallbackStore::default();
        let before = store.compute_stats();

        let updated = store.update_report_status("3", ReportStatus::Verified).unwrap();
        assert_eq!(updated.status, ReportStatus::Verified);
        assert!(updated.updated_at >= updated.created_at);

        let after = store.compute_stats();
        assert_eq!(after.verified_reports, before.verified_reports + 1);
        assert_eq!(after.pending_reports, before.pending_reports - 1);
        assert_eq!(after.total_reports, before.total_reports);
    }

    #[test]
    fn test_update_unknown_report() {
        let store = FallbackStore::default();
        assert!(store.update_report_status("nope", ReportStatus::Rejected).is_none());
    }

    #[test]
    fn test_upsert_profile_ignores_existing() {
        let store = FallbackStore::default();
        store.upsert_profile("u1", Some("Mira"));
        store.upsert_profile("u1", Some("Renamed"));
        store.upsert_profile("u2", None);
        assert_eq!(store.compute_stats().total_users, 2);

        let report = store.create_report(new_report("u1", "Named"));
        assert_eq!(report.owner_name.as_deref(), Some("Mira"));
    }

    #[test]
    fn test_get_profile_is_always_authority() {
        let store = FallbackStore::default();
        store.upsert_profile("u1", Some("Mira"));
        let profile = store.get_profile("u1").unwrap();
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.role, Role::Authority);
        assert_eq!(profile.full_name.as_deref(), Some(SAMPLE_OWNER_NAME));

        let disabled = FallbackStore::new(false);
        assert!(disabled.get_profile("u1").is_none());
    }

    #[test]
    fn test_edit_report_rules() {
        let store = FallbackStore::default();
        let report = store.create_report(new_report("u1", "Typo"));

        assert_eq!(
            store.edit_report(&report.id, "u2", "x", "y"),
            Err(EditError::NotOwner)
        );
        let edited = store.edit_report(&report.id, "u1", "Fixed", "Better").unwrap();
        assert_eq!(edited.title, "Fixed");

        store.update_report_status(&report.id, ReportStatus::Verified);
        assert_eq!(
            store.edit_report(&report.id, "u1", "Again", "No"),
            Err(EditError::NotPending(ReportStatus::Verified))
        );
        assert_eq!(store.edit_report("missing", "u1", "a", "b"), Err(EditError::NotFound));
    }
}

//! Data interfaces used when no backend is configured.

use async_trait::async_trait;

use super::{BackendStatus, LeaderboardRow, PhotoApi, ProfileApi, ReportApi, SchemaProbe};
use crate::error::BackendError;
use crate::models::{NewReport, Profile, Report, ReportStatus, Role};

/// Fails every call with a connectivity error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

fn not_configured<T>() -> Result<T, BackendError> {
    Err(BackendError::Connectivity(
        BackendError::NOT_CONFIGURED.to_string(),
    ))
}

#[async_trait]
impl ProfileApi for Offline {
    async fn get(&self, _: Option<&str>, _: &str) -> Result<Option<Profile>, BackendError> {
        not_configured()
    }

    async fn insert(&self, _: Option<&str>, _: &Profile) -> Result<(), BackendError> {
        not_configured()
    }

    async fn update_role(&self, _: Option<&str>, _: &str, _: Role) -> Result<(), BackendError> {
        not_configured()
    }

    async fn award_points(&self, _: Option<&str>, _: &str, _: u32) -> Result<(), BackendError> {
        not_configured()
    }

    async fn add_points(&self, _: Option<&str>, _: &str, _: u32) -> Result<(), BackendError> {
        not_configured()
    }

    async fn leaderboard(&self, _: Option<&str>, _: u32) -> Result<Vec<LeaderboardRow>, BackendError> {
        not_configured()
    }

    async fn count(&self, _: Option<&str>) -> Result<u32, BackendError> {
        not_configured()
    }
}

#[async_trait]
impl ReportApi for Offline {
    async fn create(&self, _: Option<&str>, _: &NewReport) -> Result<Report, BackendError> {
        not_configured()
    }

    async fn list_all(&self, _: Option<&str>) -> Result<Vec<Report>, BackendError> {
        not_configured()
    }

    async fn list_for_owner(&self, _: Option<&str>, _: &str) -> Result<Vec<Report>, BackendError> {
        not_configured()
    }

    async fn update_status(&self, _: Option<&str>, _: &str, _: ReportStatus) -> Result<(), BackendError> {
        not_configured()
    }

    async fn update_content(
        &self,
        _: Option<&str>,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
    ) -> Result<(), BackendError> {
        not_configured()
    }
}

#[async_trait]
impl PhotoApi for Offline {
    async fn upload(&self, _: Option<&str>, _: &str, _: &str, _: Vec<u8>) -> Result<String, BackendError> {
        not_configured()
    }
}

#[async_trait]
impl SchemaProbe for Offline {
    async fn probe(&self) -> BackendStatus {
        BackendStatus::default()
    }
}

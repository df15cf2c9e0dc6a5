// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted backend interfaces (auth, tables, storage, RPC).
//!
//! Each entity gets a narrow trait so call sites are checked against one
//! contract. Implementations:
//! - [`SupabaseClient`]: the hosted backend over HTTP
//! - [`LocalAuth`]: in-process accounts when no backend is configured
//! - [`Offline`]: every data call fails with a connectivity error

pub mod local_auth;
pub mod offline;
pub mod supabase;

pub use local_auth::LocalAuth;
pub use offline::Offline;
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::error::BackendError;
use crate::models::{NewReport, Profile, Report, ReportStatus, Role};

/// Table and bucket names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const REPORTS: &str = "reports";
    /// Remote procedure adding points to a profile
    pub const AWARD_POINTS: &str = "award_points";
}

/// Authenticated user handle issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    /// Metadata supplied at signup (`full_name`, `role`)
    #[serde(default, rename = "user_metadata")]
    pub metadata: SignUpMetadata,
}

/// Backend session: tokens plus the identity they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    pub user: Identity,
}

/// Metadata stored with the account at signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Profile row joined with its reports' statuses, for the leaderboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeaderboardRow {
    pub id: String,
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub points: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub reports: Vec<ReportStatusRow>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportStatusRow {
    pub status: ReportStatus,
}

/// Which parts of the backend are set up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub connected: bool,
    pub profiles_table: bool,
    pub reports_table: bool,
    pub storage_bucket: bool,
    pub award_points_function: bool,
}

/// Account operations. Tokens are the backend's own access tokens.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an account. Returns a session when no e-mail confirmation is required.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError>;
}

/// The `profiles` table and the points procedure.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn get(&self, token: Option<&str>, id: &str) -> Result<Option<Profile>, BackendError>;

    async fn insert(&self, token: Option<&str>, profile: &Profile) -> Result<(), BackendError>;

    async fn update_role(&self, token: Option<&str>, id: &str, role: Role) -> Result<(), BackendError>;

    /// Call the `award_points` remote procedure.
    async fn award_points(&self, token: Option<&str>, id: &str, points: u32) -> Result<(), BackendError>;

    /// Read-modify-write points update, for when the procedure is missing.
    async fn add_points(&self, token: Option<&str>, id: &str, points: u32) -> Result<(), BackendError>;

    /// Profiles by points, highest first, with their report statuses.
    async fn leaderboard(&self, token: Option<&str>, limit: u32) -> Result<Vec<LeaderboardRow>, BackendError>;

    async fn count(&self, token: Option<&str>) -> Result<u32, BackendError>;
}

/// The `reports` table. Lists are newest first.
#[async_trait]
pub trait ReportApi: Send + Sync {
    async fn create(&self, token: Option<&str>, report: &NewReport) -> Result<Report, BackendError>;

    async fn list_all(&self, token: Option<&str>) -> Result<Vec<Report>, BackendError>;

    async fn list_for_owner(&self, token: Option<&str>, owner_id: &str) -> Result<Vec<Report>, BackendError>;

    async fn update_status(
        &self,
        token: Option<&str>,
        id: &str,
        status: ReportStatus,
    ) -> Result<(), BackendError>;

    async fn update_content(
        &self,
        token: Option<&str>,
        id: &str,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), BackendError>;
}

/// Public photo bucket.
#[async_trait]
pub trait PhotoApi: Send + Sync {
    /// Upload under `file_name` and return the public URL.
    async fn upload(
        &self,
        token: Option<&str>,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError>;
}

/// Setup check across tables, bucket and procedure.
#[async_trait]
pub trait SchemaProbe: Send + Sync {
    async fn probe(&self) -> BackendStatus;
}

/// One handle per backend interface.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthApi>,
    pub profiles: Arc<dyn ProfileApi>,
    pub reports: Arc<dyn ReportApi>,
    pub photos: Arc<dyn PhotoApi>,
    pub probe: Arc<dyn SchemaProbe>,
}

impl Backend {
    /// Build the backend described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        match &config.supabase {
            Some(supabase) => {
                let client = Arc::new(SupabaseClient::new(
                    &supabase.url,
                    &supabase.anon_key,
                    &config.photo_bucket,
                    config.remote_timeout,
                )?);
                tracing::info!(url = %supabase.url, "Using hosted backend");
                Ok(Self::from_client(client))
            }
            None => {
                tracing::warn!("No backend configured, running in offline mode");
                Ok(Self::offline())
            }
        }
    }

    /// All interfaces served by one client.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: AuthApi + ProfileApi + ReportApi + PhotoApi + SchemaProbe + 'static,
    {
        Self {
            auth: client.clone(),
            profiles: client.clone(),
            reports: client.clone(),
            photos: client.clone(),
            probe: client,
        }
    }

    /// Local accounts, no remote data.
    pub fn offline() -> Self {
        let offline = Arc::new(Offline);
        Self {
            auth: Arc::new(LocalAuth::new()),
            profiles: offline.clone(),
            reports: offline.clone(),
            photos: offline.clone(),
            probe: offline,
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report routes for signed-in users: dashboard, submission, own reports.

use crate::error::{AppError, Result};
use crate::fallback::EditError;
use crate::middleware::session::CurrentUser;
use crate::models::report::ReportFilter;
use crate::models::{NewReport, Profile, Report, ReportStats, ReportStatus};
use crate::routes::{fallback_first, warn_on_remote_error};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Reports shown on the dashboard.
const RECENT_REPORTS: usize = 5;

/// Largest accepted photo after decoding.
const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Report routes (require a signed-in user).
/// The guard is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/report", post(submit_report))
        .route("/reports", get(my_reports))
        .route("/reports/{id}", put(edit_report))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct DashboardResponse {
    pub profile: Option<Profile>,
    pub recent_reports: Vec<Report>,
    pub stats: ReportStats,
    pub points: u32,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<DashboardResponse>> {
    let reports = own_reports(&state, &user).await?;
    let stats = ReportStats::from_reports(&reports);
    let points = user.profile.as_ref().map_or(0, |p| p.points);

    Ok(Json(DashboardResponse {
        recent_reports: reports.into_iter().take(RECENT_REPORTS).collect(),
        stats,
        points,
        profile: user.profile,
    }))
}

async fn own_reports(state: &AppState, user: &CurrentUser) -> Result<Vec<Report>> {
    fallback_first(
        state.fallback.list_reports_for(user.id()),
        state.backend.reports.list_for_owner(user.token(), user.id()),
    )
    .await
}

// ─── Submission ──────────────────────────────────────────────

/// Photo sent inline with the report.
#[derive(Debug, Deserialize)]
pub struct PhotoUpload {
    /// Original file name; only its extension is kept
    pub file_name: String,
    pub content_type: String,
    /// Base64 file contents
    pub data: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReportRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Title is too long"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: String,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
    pub photo: Option<PhotoUpload>,
}

async fn submit_report(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<SubmitReportRequest>,
) -> Result<(StatusCode, Json<Report>)> {
    let title = request.title.trim();
    let description = request.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest("Missing information".to_string()));
    }
    let photo = request
        .photo
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Photo required".to_string()))?;
    request.validate()?;

    let bytes = STANDARD
        .decode(photo.data.as_bytes())
        .map_err(|_| AppError::BadRequest("Photo is not valid base64".to_string()))?;
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::BadRequest("Photo is too large".to_string()));
    }

    state.fallback.upsert_profile(user.id(), user.display_name());

    let file_name = photo_file_name(user.id(), &photo.file_name, chrono::Utc::now().timestamp_millis());
    let photo_url = match state
        .backend
        .photos
        .upload(user.token(), &file_name, &photo.content_type, bytes)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(error = %e, file = %file_name, "Photo upload failed, continuing without photo");
            None
        }
    };

    let new_report = NewReport {
        title: title.to_string(),
        description: description.to_string(),
        photo_url,
        latitude: request.latitude,
        longitude: request.longitude,
        owner_id: user.id().to_string(),
        status: ReportStatus::Pending,
    };

    let report = state.fallback.create_report(new_report.clone());
    if let Err(e) = state.backend.reports.create(user.token(), &new_report).await {
        tracing::warn!(error = %e, report_id = %report.id, "Remote report creation failed, local copy kept");
    }

    tracing::info!(
        report_id = %report.id,
        user_id = %user.id(),
        has_photo = report.photo_url.is_some(),
        "Report submitted"
    );
    Ok((StatusCode::CREATED, Json(report)))
}

/// `{user_id}-{millis}.{ext}`, extension taken from the uploaded name.
fn photo_file_name(user_id: &str, original: &str, millis: i64) -> String {
    let ext = original
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    format!("{}-{}.{}", user_id, millis, ext)
}

// ─── My reports ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct MyReportsQuery {
    /// Status name or `all`
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Parse a `status` query value; `all` and empty mean no filter.
pub(crate) fn parse_status_filter(value: Option<&str>) -> Result<Option<ReportStatus>> {
    match value.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::BadRequest),
    }
}

#[derive(Serialize)]
pub struct ReportList {
    pub reports: Vec<Report>,
}

async fn my_reports(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<MyReportsQuery>,
) -> Result<Json<ReportList>> {
    let filter = ReportFilter {
        status: parse_status_filter(query.status.as_deref())?,
        search: query.search,
        search_owner: false,
        window: None,
    };
    let reports = own_reports(&state, &user).await?;
    Ok(Json(ReportList {
        reports: filter.apply(reports, chrono::Utc::now()),
    }))
}

// ─── Edit ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct EditReportRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
}

async fn edit_report(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<EditReportRequest>,
) -> Result<Json<Report>> {
    request.validate()?;
    let title = request.title.trim();
    let description = request.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest("Missing information".to_string()));
    }

    let reports = &state.backend.reports;

    match state.fallback.edit_report(&id, user.id(), title, description) {
        Ok(report) => {
            warn_on_remote_error(
                reports
                    .update_content(user.token(), &id, user.id(), title, description)
                    .await,
                "report edit",
            );
            Ok(Json(report))
        }
        Err(EditError::NotFound) => {
            // Only the backend knows this report.
            reports
                .update_content(user.token(), &id, user.id(), title, description)
                .await?;
            let report = reports
                .list_for_owner(user.token(), user.id())
                .await?
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("report {}", id)))?;
            Ok(Json(report))
        }
        Err(EditError::NotOwner) => Err(AppError::Forbidden(EditError::NotOwner.to_string())),
        Err(e @ EditError::NotPending(_)) => Err(AppError::BadRequest(e.to_string())),
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authority routes: review queue, status changes, roles and analytics.

use crate::config::POINTS_FOR_VERIFICATION;
use crate::error::{AppError, BackendError, Result};
use crate::middleware::session::CurrentUser;
use crate::models::analytics::{self, LocationCount, StatusCount, Timeframe, TimeSeriesPoint};
use crate::models::report::{DateWindow, ReportFilter};
use crate::models::{Report, ReportStats, ReportStatus, Role};
use crate::routes::reports::parse_status_filter;
use crate::routes::{fallback_first, warn_on_remote_error};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authority routes. The guard is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(admin_dashboard))
        .route("/admin/reports/{id}/status", post(update_status))
        .route("/admin/profiles/{id}/role", put(update_role))
        .route("/analytics", get(analytics_view))
}

async fn all_reports(state: &AppState, token: Option<&str>) -> Result<Vec<Report>> {
    fallback_first(
        state.fallback.list_all_reports(),
        state.backend.reports.list_all(token),
    )
    .await
}

/// Global counts: the fallback store when it has data, else the backend.
async fn global_stats(state: &AppState, token: Option<&str>) -> Result<ReportStats> {
    let local = state.fallback.compute_stats();
    if local.total_reports > 0 {
        return Ok(local);
    }

    let reports = state.backend.reports.list_all(token).await?;
    let users = match state.backend.profiles.count(token).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Error fetching user count");
            0
        }
    };
    Ok(ReportStats::from_reports(&reports).with_users(users))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    /// Status name or `all`
    pub status: Option<String>,
    /// Matches title, description or owner name
    pub search: Option<String>,
    pub window: Option<DateWindow>,
}

#[derive(Serialize)]
pub struct AdminDashboardResponse {
    pub reports: Vec<Report>,
    pub stats: ReportStats,
}

async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<AdminQuery>,
) -> Result<Json<AdminDashboardResponse>> {
    let filter = ReportFilter {
        status: parse_status_filter(query.status.as_deref())?,
        search: query.search,
        search_owner: true,
        window: query.window,
    };

    let reports = all_reports(&state, user.token()).await?;
    let stats = global_stats(&state, user.token()).await?;

    Ok(Json(AdminDashboardResponse {
        reports: filter.apply(reports, chrono::Utc::now()),
        stats,
    }))
}

// ─── Status change ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ReportStatus,
}

#[derive(Serialize)]
pub struct StatusUpdateResponse {
    pub report: Report,
    pub points_awarded: u32,
    pub stats: ReportStats,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>> {
    let token = user.token();
    let status = request.status;
    let reports = &state.backend.reports;

    let report = match state.fallback.update_report_status(&id, status) {
        Some(report) => {
            warn_on_remote_error(reports.update_status(token, &id, status).await, "status update");
            report
        }
        None => {
            let mut report = reports
                .list_all(token)
                .await?
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("report {}", id)))?;
            reports.update_status(token, &id, status).await?;
            report.status = status;
            report.updated_at = chrono::Utc::now();
            report
        }
    };

    tracing::info!(
        report_id = %report.id,
        status = %status,
        reviewer = %user.id(),
        updated_at = %format_utc_rfc3339(report.updated_at),
        "Report status updated"
    );

    let points_awarded = if status == ReportStatus::Verified {
        match award_points(&state, token, &report.owner_id, POINTS_FOR_VERIFICATION).await {
            Ok(()) => POINTS_FOR_VERIFICATION,
            Err(e) => {
                tracing::warn!(user_id = %report.owner_id, error = %e, "Error awarding points");
                0
            }
        }
    } else {
        0
    };

    let stats = global_stats(&state, token).await?;
    Ok(Json(StatusUpdateResponse {
        report,
        points_awarded,
        stats,
    }))
}

/// Award through the remote procedure; update the row directly when the
/// procedure is missing or refused.
async fn award_points(
    state: &AppState,
    token: Option<&str>,
    user_id: &str,
    points: u32,
) -> std::result::Result<(), BackendError> {
    let profiles = &state.backend.profiles;
    match profiles.award_points(token, user_id, points).await {
        Ok(()) => {
            tracing::info!(user_id = %user_id, points, "Points awarded");
            Ok(())
        }
        Err(e) if e.is_connectivity() => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "award_points procedure failed, updating profile directly");
            profiles.add_points(token, user_id, points).await?;
            tracing::info!(user_id = %user_id, points, "Points awarded by direct update");
            Ok(())
        }
    }
}

// ─── Roles ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

#[derive(Serialize)]
pub struct RoleUpdateResponse {
    pub id: String,
    pub role: Role,
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<RoleUpdateRequest>,
) -> Result<Json<RoleUpdateResponse>> {
    state
        .backend
        .profiles
        .update_role(user.token(), &id, request.role)
        .await?;
    tracing::info!(user_id = %id, role = %request.role, changed_by = %user.id(), "Role updated");

    Ok(Json(RoleUpdateResponse {
        id,
        role: request.role,
    }))
}

// ─── Analytics ───────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub timeframe: Timeframe,
}

#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub timeframe: Timeframe,
    pub total_reports: u32,
    pub status_distribution: Vec<StatusCount>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub top_locations: Vec<LocationCount>,
}

async fn analytics_view(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>> {
    let reports = all_reports(&state, user.token()).await?;
    let now = chrono::Utc::now();

    Ok(Json(AnalyticsResponse {
        timeframe: query.timeframe,
        total_reports: reports.len() as u32,
        status_distribution: analytics::status_distribution(&reports),
        time_series: analytics::time_series(&reports, query.timeframe, now),
        top_locations: analytics::top_locations(&reports),
    }))
}

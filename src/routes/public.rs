// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Landing page, leaderboard, health and backend status.

use crate::backend::{BackendStatus, LeaderboardRow};
use crate::error::Result;
use crate::guard::SIGN_IN_PAGE;
use crate::models::profile::{Badge, ANONYMOUS_NAME};
use crate::models::{LeaderboardEntry, ReportStatus};
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Profiles shown on the leaderboard.
pub const LEADERBOARD_SIZE: u32 = 50;

/// Public pages (visitors who are not signed in).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/leaderboard", get(leaderboard))
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub tagline: &'static str,
    pub sign_in: &'static str,
    pub offline: bool,
}

async fn index(State(state): State<Arc<AppState>>) -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "Mangrove Watch",
        tagline: "Report, verify and track threats to mangrove ecosystems",
        sign_in: SIGN_IN_PAGE,
        offline: state.config.is_offline(),
    })
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub users: Vec<LeaderboardEntry>,
}

async fn leaderboard(State(state): State<Arc<AppState>>) -> Result<Json<LeaderboardResponse>> {
    let rows = state
        .backend
        .profiles
        .leaderboard(None, LEADERBOARD_SIZE)
        .await?;
    Ok(Json(LeaderboardResponse {
        users: rank(rows),
    }))
}

/// Number rows from 1 in the order given and attach badges.
pub fn rank(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .zip(1..)
        .map(|(row, rank)| {
            let verified_reports = row
                .reports
                .iter()
                .filter(|r| r.status == ReportStatus::Verified)
                .count() as u32;
            let badge = Badge::for_standing(rank, row.points);
            LeaderboardEntry {
                full_name: row
                    .full_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
                points: row.points,
                verified_reports,
                total_reports: row.reports.len() as u32,
                rank,
                badge,
                badge_label: badge.label(),
                id: row.id,
            }
        })
        .collect()
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
pub async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub offline: bool,
    #[serde(flatten)]
    pub backend: BackendStatus,
    pub ready: bool,
}

/// Which parts of the backend are set up.
pub async fn backend_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let backend = state.backend.probe.probe().await;
    let ready = backend.connected
        && backend.profiles_table
        && backend.reports_table
        && backend.storage_bucket
        && backend.award_points_function;
    if !ready {
        tracing::info!(?backend, "Backend setup incomplete");
    }
    Json(StatusResponse {
        offline: state.config.is_offline(),
        backend,
        ready,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReportStatusRow;

    fn row(id: &str, name: Option<&str>, points: u32, statuses: &[ReportStatus]) -> LeaderboardRow {
        LeaderboardRow {
            id: id.to_string(),
            full_name: name.map(str::to_string),
            points,
            reports: statuses
                .iter()
                .map(|&status| ReportStatusRow { status })
                .collect(),
        }
    }

    #[test]
    fn test_rank_assigns_badges_and_counts() {
        use ReportStatus::*;
        let entries = rank(vec![
            row("a", Some("Ana"), 120, &[Verified, Verified, Pending]),
            row("b", None, 110, &[Verified]),
            row("c", Some("  "), 105, &[]),
            row("d", Some("Dev"), 100, &[Rejected]),
            row("e", Some("Eli"), 55, &[]),
            row("f", Some("Fay"), 20, &[]),
            row("g", Some("Gus"), 0, &[]),
        ]);

        let ranks: Vec<u32> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(entries[0].verified_reports, 2);
        assert_eq!(entries[0].total_reports, 3);
        assert_eq!(entries[1].full_name, ANONYMOUS_NAME);
        assert_eq!(entries[2].full_name, ANONYMOUS_NAME);

        let badges: Vec<Badge> = entries.iter().map(|e| e.badge).collect();
        assert_eq!(
            badges,
            vec![
                Badge::Champion,
                Badge::SilverGuardian,
                Badge::BronzeProtector,
                Badge::EcoWarrior,
                Badge::TopGuardian,
                Badge::RisingStar,
                Badge::NewGuardian,
            ]
        );
    }
}

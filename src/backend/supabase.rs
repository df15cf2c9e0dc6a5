// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the hosted backend.
//!
//! Speaks the backend's existing REST surface:
//! - `/auth/v1` for accounts and sessions
//! - `/rest/v1` for the `profiles` and `reports` tables
//! - `/rest/v1/rpc/award_points` for the points procedure
//! - `/storage/v1` for the photo bucket

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{
    tables, AuthApi, BackendStatus, Identity, LeaderboardRow, PhotoApi, ProfileApi, ReportApi,
    SchemaProbe, Session, SignUpMetadata,
};
use crate::error::BackendError;
use crate::models::{NewReport, Profile, Report, ReportStatus, Role};

/// Backend client. Cheap to clone.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bucket: String,
}

/// Error bodies differ between auth, PostgREST and storage.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// `reports` row with the owner's name embedded.
#[derive(Deserialize)]
struct ReportRow {
    #[serde(flatten)]
    report: Report,
    #[serde(default)]
    profiles: Option<OwnerName>,
}

#[derive(Deserialize)]
struct OwnerName {
    full_name: Option<String>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        let mut report = row.report;
        report.owner_name = row.profiles.and_then(|p| p.full_name);
        report
    }
}

const REPORT_SELECT: &str = "*,profiles(full_name)";

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        bucket: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Public URL of an object in the photo bucket.
    pub fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(file_name)
        )
    }

    /// Attach the anon key and the caller's token (anon key when absent).
    fn authed(&self, req: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    /// Check response status and return a classified error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| e.message.or(e.msg).or(e.error_description).or(e.error))
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        tracing::debug!(status = status.as_u16(), error = %message, "Backend request failed");
        Err(BackendError::classify(status.as_u16(), &message))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Api(format!("JSON parse error: {}", e)))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .authed(self.http.get(self.rest_url(table)), token)
            .query(query)
            .send()
            .await?;
        Self::check_response_json(response).await
    }

    async fn patch(
        &self,
        token: Option<&str>,
        table: &str,
        filters: &[(&str, String)],
        body: serde_json::Value,
    ) -> Result<(), BackendError> {
        let response = self
            .authed(self.http.patch(self.rest_url(table)), token)
            .query(filters)
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn auth_token(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, BackendError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .header("apikey", &self.anon_key)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        Self::check_response_json(response).await
    }

    async fn reports(&self, token: Option<&str>, owner_id: Option<&str>) -> Result<Vec<Report>, BackendError> {
        let mut query = vec![
            ("select", REPORT_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(owner_id) = owner_id {
            query.push(("user_id", format!("eq.{}", owner_id)));
        }
        let rows: Vec<ReportRow> = self.select(token, tables::REPORTS, &query).await?;
        Ok(rows.into_iter().map(Report::from).collect())
    }

    async fn reachable(&self, req: reqwest::RequestBuilder) -> (bool, bool) {
        match req.send().await {
            Err(_) => (false, false),
            Ok(resp) => {
                let ok = resp.status().is_success();
                (true, ok)
            }
        }
    }
}

#[async_trait]
impl AuthApi for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, BackendError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;

        // With e-mail confirmation enabled the body is a bare user, not a session.
        let body: serde_json::Value = Self::check_response_json(response).await?;
        if body.get("access_token").is_some() {
            let session = serde_json::from_value(body)
                .map_err(|e| BackendError::Api(format!("JSON parse error: {}", e)))?;
            Ok(Some(session))
        } else {
            let user: Identity = serde_json::from_value(body)
                .map_err(|e| BackendError::Api(format!("JSON parse error: {}", e)))?;
            tracing::info!(user_id = %user.id, "Sign-up pending e-mail confirmation");
            Ok(None)
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.auth_token(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .authed(self.http.post(self.auth_url("logout")), Some(access_token))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.auth_token(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}

#[async_trait]
impl ProfileApi for SupabaseClient {
    async fn get(&self, token: Option<&str>, id: &str) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .select(
                token,
                tables::PROFILES,
                &[("select", "*".to_string()), ("id", format!("eq.{}", id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, token: Option<&str>, profile: &Profile) -> Result<(), BackendError> {
        let response = self
            .authed(self.http.post(self.rest_url(tables::PROFILES)), token)
            .header("Prefer", "return=minimal")
            .json(profile)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn update_role(&self, token: Option<&str>, id: &str, role: Role) -> Result<(), BackendError> {
        self.patch(
            token,
            tables::PROFILES,
            &[("id", format!("eq.{}", id))],
            serde_json::json!({ "role": role, "updated_at": chrono::Utc::now() }),
        )
        .await
    }

    async fn award_points(&self, token: Option<&str>, id: &str, points: u32) -> Result<(), BackendError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, tables::AWARD_POINTS);
        let response = self
            .authed(self.http.post(url), token)
            .json(&serde_json::json!({ "user_id": id, "points_to_add": points }))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn add_points(&self, token: Option<&str>, id: &str, points: u32) -> Result<(), BackendError> {
        let current = self
            .get(token, id)
            .await?
            .ok_or_else(|| BackendError::Api(format!("Profile {} not found", id)))?;

        self.patch(
            token,
            tables::PROFILES,
            &[("id", format!("eq.{}", id))],
            serde_json::json!({
                "points": current.points.saturating_add(points),
                "updated_at": chrono::Utc::now(),
            }),
        )
        .await
    }

    async fn leaderboard(&self, token: Option<&str>, limit: u32) -> Result<Vec<LeaderboardRow>, BackendError> {
        self.select(
            token,
            tables::PROFILES,
            &[
                ("select", "id,full_name,points,reports!inner(status)".to_string()),
                ("order", "points.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn count(&self, token: Option<&str>) -> Result<u32, BackendError> {
        let response = self
            .authed(self.http.head(self.rest_url(tables::PROFILES)), token)
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        // Content-Range: 0-24/57 (or */0 when empty)
        response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|total| total.parse().ok())
            .ok_or_else(|| BackendError::Api("Missing profile count".to_string()))
    }
}

#[async_trait]
impl ReportApi for SupabaseClient {
    async fn create(&self, token: Option<&str>, report: &NewReport) -> Result<Report, BackendError> {
        let response = self
            .authed(self.http.post(self.rest_url(tables::REPORTS)), token)
            .header("Prefer", "return=representation")
            .json(report)
            .send()
            .await?;
        let rows: Vec<Report> = Self::check_response_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Api("Insert returned no rows".to_string()))
    }

    async fn list_all(&self, token: Option<&str>) -> Result<Vec<Report>, BackendError> {
        self.reports(token, None).await
    }

    async fn list_for_owner(&self, token: Option<&str>, owner_id: &str) -> Result<Vec<Report>, BackendError> {
        self.reports(token, Some(owner_id)).await
    }

    async fn update_status(
        &self,
        token: Option<&str>,
        id: &str,
        status: ReportStatus,
    ) -> Result<(), BackendError> {
        self.patch(
            token,
            tables::REPORTS,
            &[("id", format!("eq.{}", id))],
            serde_json::json!({ "status": status, "updated_at": chrono::Utc::now() }),
        )
        .await
    }

    async fn update_content(
        &self,
        token: Option<&str>,
        id: &str,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), BackendError> {
        self.patch(
            token,
            tables::REPORTS,
            &[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", owner_id)),
            ],
            serde_json::json!({
                "title": title,
                "description": description,
                "updated_at": chrono::Utc::now(),
            }),
        )
        .await
    }
}

#[async_trait]
impl PhotoApi for SupabaseClient {
    async fn upload(
        &self,
        token: Option<&str>,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(file_name)
        );
        let response = self
            .authed(self.http.post(url), token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check_response(response).await?;

        Ok(self.public_url(file_name))
    }
}

#[async_trait]
impl SchemaProbe for SupabaseClient {
    async fn probe(&self) -> BackendStatus {
        let limit_one = [("select", "id"), ("limit", "1")];

        let (connected, profiles_table) = self
            .reachable(
                self.authed(self.http.get(self.rest_url(tables::PROFILES)), None)
                    .query(&limit_one),
            )
            .await;
        let (_, reports_table) = self
            .reachable(
                self.authed(self.http.get(self.rest_url(tables::REPORTS)), None)
                    .query(&limit_one),
            )
            .await;
        let (_, storage_bucket) = self
            .reachable(self.authed(
                self.http
                    .get(format!("{}/storage/v1/bucket/{}", self.base_url, self.bucket)),
                None,
            ))
            .await;

        // A policy rejection still proves the function exists.
        let award_points_function = match self
            .award_points(None, "00000000-0000-0000-0000-000000000000", 0)
            .await
        {
            Ok(()) => true,
            Err(BackendError::Permission(_)) => true,
            Err(_) => false,
        };

        let status = BackendStatus {
            connected,
            profiles_table,
            reports_table,
            storage_bucket,
            award_points_function,
        };
        tracing::debug!(?status, "Backend probe complete");
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&server.uri(), "anon-key", "incident-photos", Duration::from_secs(5))
            .unwrap()
    }

    fn session_json() -> serde_json::Value {
        serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "11111111-1111-1111-1111-111111111111",
                "email": "mira@example.com",
                "user_metadata": { "full_name": "Mira", "role": "authority" }
            }
        })
    }

    #[tokio::test]
    async fn test_sign_in_parses_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .mount(&server)
            .await;

        let session = client(&server).sign_in("mira@example.com", "pw").await.unwrap();
        assert_eq!(session.access_token, "at");
        assert_eq!(session.user.metadata.role, Some(Role::Authority));
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "22222222-2222-2222-2222-222222222222",
                "email": "new@example.com",
                "user_metadata": {}
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .sign_up("new@example.com", "pw123456", &SignUpMetadata::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_table_is_schema_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/reports"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": "42P01",
                "message": "relation \"public.reports\" does not exist"
            })))
            .mount(&server)
            .await;

        let err = client(&server).list_all(None).await.unwrap_err();
        assert!(err.is_missing_schema(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_policy_rejection_is_permission_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/reports"))
            .and(query_param("id", "eq.r1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "code": "42501",
                "message": "new row violates row-level security policy for table \"reports\""
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .update_status(Some("user-token"), "r1", ReportStatus::Verified)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Permission(_)));
    }

    #[tokio::test]
    async fn test_list_reports_embeds_owner_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/reports"))
            .and(query_param("user_id", "eq.u1"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "r1", "title": "Oil", "description": "Spill",
                "photo_url": null, "latitude": null, "longitude": null,
                "status": "pending", "user_id": "u1",
                "created_at": "2024-01-15T10:30:00+00:00",
                "updated_at": "2024-01-15T10:30:00+00:00",
                "profiles": { "full_name": "Mira" }
            }])))
            .mount(&server)
            .await;

        let reports = client(&server).list_for_owner(None, "u1").await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].owner_name.as_deref(), Some("Mira"));
    }

    #[tokio::test]
    async fn test_award_points_rpc_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/award_points"))
            .and(body_json(serde_json::json!({ "user_id": "u1", "points_to_add": 10 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).award_points(Some("t"), "u1", 10).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/incident-photos/u1-1700000000000.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "incident-photos/u1-1700000000000.jpg"
            })))
            .mount(&server)
            .await;

        let url = client(&server)
            .upload(Some("t"), "u1-1700000000000.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/incident-photos/u1-1700000000000.jpg",
                server.uri()
            )
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connectivity_error() {
        let client = SupabaseClient::new(
            "http://127.0.0.1:9",
            "anon-key",
            "incident-photos",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.get(None, "u1").await.unwrap_err();
        assert!(err.is_connectivity(), "got {:?}", err);
    }
}

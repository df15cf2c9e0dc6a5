// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mangrove Watch: community reporting of threats to mangrove ecosystems
//!
//! This crate provides the backend-for-frontend API: it signs users in
//! against the hosted backend, guards pages by role, and serves report
//! data from an in-memory fallback store when the backend has none.

pub mod auth_client;
pub mod backend;
pub mod config;
pub mod credential;
pub mod error;
pub mod fallback;
pub mod guard;
pub mod middleware;
pub mod models;
pub mod profile_resolver;
pub mod routes;
pub mod session;
pub mod time_utils;

use auth_client::AuthClient;
use backend::Backend;
use chrono::{DateTime, Utc};
use config::Config;
use fallback::FallbackStore;
use profile_resolver::ProfileResolver;
use session::{ClientSession, SessionRegistry};
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: Backend,
    pub fallback: Arc<FallbackStore>,
    pub resolver: Arc<ProfileResolver>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config, backend: Backend) -> Self {
        let fallback = Arc::new(FallbackStore::new(config.fallback_admin_profile));
        let resolver = Arc::new(ProfileResolver::new(
            backend.profiles.clone(),
            fallback.clone(),
        ));
        Self {
            config,
            backend,
            fallback,
            resolver,
            sessions: SessionRegistry::new(),
        }
    }

    /// Start following `client` and register the new browser session.
    /// Expired sessions are swept first.
    pub fn start_session(&self, client: Arc<AuthClient>) -> Arc<ClientSession> {
        self.prune_expired_sessions(Utc::now());
        let session = Arc::new(ClientSession::start(
            client,
            self.resolver.clone(),
            self.fallback.clone(),
        ));
        self.sessions.insert(session.id, session.clone());
        session
    }

    /// Drop every session expired at `now`. Returns how many were removed.
    pub fn prune_expired_sessions(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| *entry.key())
            .collect();
        for id in &expired {
            self.end_session(*id);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Pruned expired sessions");
        }
        expired.len()
    }

    /// Drop a browser session and stop its listener.
    pub fn end_session(&self, id: Uuid) {
        if let Some((_, session)) = self.sessions.remove(&id) {
            session.store.shutdown();
        }
    }
}

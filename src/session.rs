// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: the current identity, its profile and backend token.
//!
//! State machine: `Unknown -> {Authenticated(identity), Anonymous}`, driven by
//! a one-shot pull of the client's session at start and then by the client's
//! auth notifications. The state is published on a watch channel so the
//! route guard reads a consistent snapshot.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth_client::AuthClient;
use crate::backend::{Identity, Session};
use crate::fallback::FallbackStore;
use crate::models::Profile;
use crate::profile_resolver::ProfileResolver;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    /// Startup check still running
    #[default]
    Unknown,
    Authenticated(Identity),
    Anonymous,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub profile: Option<Profile>,
    /// Backend access token for data calls made on the user's behalf
    pub access_token: Option<String>,
}

impl SessionSnapshot {
    /// Snapshot for a request with no session at all.
    pub fn anonymous() -> Self {
        Self {
            state: SessionState::Anonymous,
            ..Self::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Unknown
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Watches one [`AuthClient`] and keeps a [`SessionSnapshot`] current.
pub struct SessionStore {
    snapshot: watch::Receiver<SessionSnapshot>,
    listener: JoinHandle<()>,
}

impl SessionStore {
    /// Subscribe to `client`, pull its current session, then follow events.
    ///
    /// Subscribing first means a change racing the startup pull is still
    /// applied after it.
    pub fn start(
        client: Arc<AuthClient>,
        resolver: Arc<ProfileResolver>,
        fallback: Arc<FallbackStore>,
    ) -> Self {
        let (tx, snapshot) = watch::channel(SessionSnapshot::default());
        let mut events = client.subscribe();

        let listener = tokio::spawn(async move {
            apply(&tx, &resolver, &fallback, client.current_session()).await;

            loop {
                match events.recv().await {
                    Ok((event, session)) => {
                        tracing::debug!(?event, "Auth state changed");
                        apply(&tx, &resolver, &fallback, session).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth events dropped, re-reading session");
                        apply(&tx, &resolver, &fallback, client.current_session()).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { snapshot, listener }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until the snapshot satisfies `done` and return it.
    pub async fn wait_for(&self, done: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut rx = self.snapshot.clone();
        let result = rx.wait_for(done).await.map(|s| (*s).clone());
        // The sender only goes away with the listener task; use what is there.
        result.unwrap_or_else(|_| self.snapshot())
    }

    /// Wait for the startup check to finish.
    pub async fn ready(&self) -> SessionSnapshot {
        self.wait_for(|s| !s.is_loading()).await
    }

    /// Stop following auth notifications.
    pub fn shutdown(&self) {
        self.listener.abort();
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn apply(
    tx: &watch::Sender<SessionSnapshot>,
    resolver: &ProfileResolver,
    fallback: &FallbackStore,
    session: Option<Session>,
) {
    let Some(Session {
        access_token, user, ..
    }) = session
    else {
        tx.send_modify(|snap| *snap = SessionSnapshot::anonymous());
        return;
    };

    fallback.initialize();

    resolver
        .resolve(Some(&access_token), &user.id, |profile| {
            tx.send_modify(|snap| {
                let same_user = snap.identity().is_some_and(|i| i.id == user.id);
                // A token refresh without a cached profile keeps the old one.
                if profile.is_some() || !same_user {
                    snap.profile = profile;
                }
                snap.state = SessionState::Authenticated(user.clone());
                snap.access_token = Some(access_token.clone());
            });
        })
        .await;
}

/// Lifetime of a browser session, and of the cookie naming it.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Server-side state for one browser session.
pub struct ClientSession {
    pub id: Uuid,
    pub client: Arc<AuthClient>,
    pub store: SessionStore,
    pub expires_at: DateTime<Utc>,
}

impl ClientSession {
    pub fn start(
        client: Arc<AuthClient>,
        resolver: Arc<ProfileResolver>,
        fallback: Arc<FallbackStore>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: SessionStore::start(client.clone(), resolver, fallback),
            client,
            expires_at: Utc::now() + Duration::seconds(SESSION_TTL_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Live browser sessions by id.
pub type SessionRegistry = DashMap<Uuid, Arc<ClientSession>>;

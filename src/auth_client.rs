// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-browser auth client.
//!
//! Wraps an [`AuthApi`], holds the current backend session, and pushes an
//! `(AuthEvent, Option<Session>)` pair to subscribers on every change.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

use crate::backend::{AuthApi, Session, SignUpMetadata};
use crate::error::BackendError;

/// Buffered auth notifications per client.
const EVENT_CAPACITY: usize = 16;

/// Kind of session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Auth state change as delivered to subscribers.
pub type AuthNotification = (AuthEvent, Option<Session>);

pub struct AuthClient {
    api: Arc<dyn AuthApi>,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthNotification>,
}

impl AuthClient {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            session: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to session changes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthNotification> {
        self.events.subscribe()
    }

    /// The session held right now.
    pub fn current_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current_session().map(|s| s.access_token)
    }

    fn publish(&self, event: AuthEvent, session: Option<Session>) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send((event, session));
    }

    /// Create an account. When the backend starts a session right away the
    /// client is signed in; otherwise e-mail confirmation is pending.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, BackendError> {
        let session = self.api.sign_up(email, password, metadata).await?;
        if let Some(session) = &session {
            self.publish(AuthEvent::SignedIn, Some(session.clone()));
        }
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let session = self.api.sign_in(email, password).await?;
        tracing::debug!(user_id = %session.user.id, "Signed in");
        self.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Sign out. The local session is dropped even if the backend call fails.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let result = match self.access_token() {
            Some(token) => self.api.sign_out(&token).await,
            None => Ok(()),
        };
        self.publish(AuthEvent::SignedOut, None);
        result
    }

    /// Exchange the refresh token for a new session.
    pub async fn refresh(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .current_session()
            .map(|s| s.refresh_token)
            .ok_or_else(|| BackendError::Auth("no active session".to_string()))?;
        let session = self.api.refresh(&refresh_token).await?;
        self.publish(AuthEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalAuth;

    fn client() -> AuthClient {
        AuthClient::new(Arc::new(LocalAuth::new()))
    }

    #[tokio::test]
    async fn test_events_follow_session_changes() {
        let client = client();
        let mut events = client.subscribe();

        client
            .sign_up("e@example.com", "secret1", &SignUpMetadata::default())
            .await
            .unwrap();
        let (event, session) = events.recv().await.unwrap();
        assert_eq!(event, AuthEvent::SignedIn);
        let first = session.unwrap();

        let refreshed = client.refresh().await.unwrap();
        let (event, session) = events.recv().await.unwrap();
        assert_eq!(event, AuthEvent::TokenRefreshed);
        assert_eq!(session.unwrap().access_token, refreshed.access_token);
        assert_ne!(refreshed.access_token, first.access_token);

        client.sign_out().await.unwrap();
        let (event, session) = events.recv().await.unwrap();
        assert_eq!(event, AuthEvent::SignedOut);
        assert!(session.is_none());
        assert!(client.current_session().is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_state() {
        let client = client();
        let mut events = client.subscribe();
        assert!(client.sign_in("nobody@example.com", "secret1").await.is_err());
        assert!(client.current_session().is_none());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let err = client().refresh().await.unwrap_err();
        assert!(matches!(err, BackendError::Auth(_)));
    }
}

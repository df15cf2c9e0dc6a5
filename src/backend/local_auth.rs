// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process accounts used when no hosted backend is configured.
//!
//! Accounts and sessions live in memory and are lost on restart.
//! Passwords are stored as salted PBKDF2-HMAC-SHA256 hashes.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

use super::{AuthApi, Identity, Session, SignUpMetadata};
use crate::error::BackendError;

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(60_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const TOKEN_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;
const SESSION_TTL_SECS: i64 = 3600;

struct Account {
    identity: Identity,
    salt: [u8; SALT_LEN],
    password_hash: [u8; HASH_LEN],
}

/// In-memory auth service.
pub struct LocalAuth {
    rng: SystemRandom,
    /// Accounts keyed by lower-cased e-mail
    accounts: DashMap<String, Account>,
    /// Access token -> e-mail key
    access_tokens: DashMap<String, String>,
    /// Refresh token -> grant it renews
    refresh_tokens: DashMap<String, RefreshGrant>,
}

/// What a refresh token renews: the account and the access token issued with it.
struct RefreshGrant {
    key: String,
    access_token: String,
}

impl Default for LocalAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalAuth {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
            accounts: DashMap::new(),
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
        }
    }

    /// Identity behind a live access token.
    pub fn identity_for_token(&self, access_token: &str) -> Option<Identity> {
        let key = self.access_tokens.get(access_token)?.clone();
        self.accounts.get(&key).map(|a| a.identity.clone())
    }

    fn random_bytes<const N: usize>(&self) -> Result<[u8; N], BackendError> {
        let mut buf = [0u8; N];
        self.rng
            .fill(&mut buf)
            .map_err(|_| BackendError::Api("random number generator failed".to_string()))?;
        Ok(buf)
    }

    fn issue_session(&self, key: &str, identity: Identity) -> Result<Session, BackendError> {
        let access_token = hex::encode(self.random_bytes::<TOKEN_LEN>()?);
        let refresh_token = hex::encode(self.random_bytes::<TOKEN_LEN>()?);
        self.access_tokens
            .insert(access_token.clone(), key.to_string());
        self.refresh_tokens.insert(
            refresh_token.clone(),
            RefreshGrant {
                key: key.to_string(),
                access_token: access_token.clone(),
            },
        );

        Ok(Session {
            access_token,
            refresh_token,
            expires_in: SESSION_TTL_SECS,
            user: identity,
        })
    }
}

fn hash_password(salt: &[u8], password: &str) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt,
        password.as_bytes(),
        &mut out,
    );
    out
}

#[async_trait]
impl AuthApi for LocalAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, BackendError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::Api(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let key = email.trim().to_lowercase();
        let salt = self.random_bytes::<SALT_LEN>()?;
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.trim().to_string()),
            metadata: metadata.clone(),
        };

        match self.accounts.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(BackendError::Api("User already registered".to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    identity: identity.clone(),
                    salt,
                    password_hash: hash_password(&salt, password),
                });
            }
        }

        tracing::info!(user_id = %identity.id, "Local account created");
        self.issue_session(&key, identity).map(Some)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let key = email.trim().to_lowercase();
        let identity = {
            let account = self
                .accounts
                .get(&key)
                .ok_or_else(|| BackendError::Auth("Invalid login credentials".to_string()))?;

            pbkdf2::verify(
                pbkdf2::PBKDF2_HMAC_SHA256,
                PBKDF2_ITERATIONS,
                &account.salt,
                password.as_bytes(),
                &account.password_hash,
            )
            .map_err(|_| BackendError::Auth("Invalid login credentials".to_string()))?;

            account.identity.clone()
        };

        self.issue_session(&key, identity)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        if let Some((_, key)) = self.access_tokens.remove(access_token) {
            self.refresh_tokens.retain(|_, grant| grant.key != key);
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let (_, RefreshGrant { key, access_token }) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Auth("Invalid refresh token".to_string()))?;
        // The superseded access token stops working.
        self.access_tokens.remove(&access_token);
        let identity = self
            .accounts
            .get(&key)
            .map(|a| a.identity.clone())
            .ok_or_else(|| BackendError::Auth("User not found".to_string()))?;
        self.issue_session(&key, identity)
    }
}

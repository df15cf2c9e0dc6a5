//! Attach a profile to a signed-in identity.
//!
//! The fallback store answers synchronously and is published first; the
//! remote row, when it arrives, replaces it. Remote failures never reach
//! the caller.

use std::sync::Arc;

use crate::backend::ProfileApi;
use crate::fallback::FallbackStore;
use crate::models::Profile;

pub struct ProfileResolver {
    profiles: Arc<dyn ProfileApi>,
    fallback: Arc<FallbackStore>,
}

impl ProfileResolver {
    pub fn new(profiles: Arc<dyn ProfileApi>, fallback: Arc<FallbackStore>) -> Self {
        Self { profiles, fallback }
    }

    /// Profile from the fallback store, if it answers.
    pub fn cached(&self, id: &str) -> Option<Profile> {
        self.fallback.get_profile(id)
    }

    /// Remote lookup by primary key. Errors are logged and mapped to `None`.
    pub async fn fetch(&self, token: Option<&str>, id: &str) -> Option<Profile> {
        match self.profiles.get(token, id).await {
            Ok(profile) => profile,
            Err(e) if e.is_connectivity() => {
                tracing::debug!(user_id = %id, error = %e, "Remote profile unavailable");
                None
            }
            Err(e) => {
                tracing::warn!(user_id = %id, error = %e, "Failed to fetch profile");
                None
            }
        }
    }

    /// Resolve the profile for `id`.
    ///
    /// `publish` is always called once before the first await, with the
    /// cached profile or `None`. It is called a second time with the remote
    /// profile if the lookup found one; that value is the last write.
    pub async fn resolve<F>(&self, token: Option<&str>, id: &str, mut publish: F)
    where
        F: FnMut(Option<Profile>),
    {
        publish(self.cached(id));
        if let Some(profile) = self.fetch(token, id).await {
            publish(Some(profile));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LeaderboardRow, Offline};
    use crate::error::BackendError;
    use crate::models::Role;
    use async_trait::async_trait;

    /// Profile table with one fixed row.
    struct OneProfile(Profile);

    #[async_trait]
    impl ProfileApi for OneProfile {
        async fn get(&self, _: Option<&str>, id: &str) -> Result<Option<Profile>, BackendError> {
            Ok((id == self.0.id).then(|| self.0.clone()))
        }
        async fn insert(&self, _: Option<&str>, _: &Profile) -> Result<(), BackendError> {
            Ok(())
        }
        async fn update_role(&self, _: Option<&str>, _: &str, _: Role) -> Result<(), BackendError> {
            Ok(())
        }
        async fn award_points(&self, _: Option<&str>, _: &str, _: u32) -> Result<(), BackendError> {
            Ok(())
        }
        async fn add_points(&self, _: Option<&str>, _: &str, _: u32) -> Result<(), BackendError> {
            Ok(())
        }
        async fn leaderboard(&self, _: Option<&str>, _: u32) -> Result<Vec<LeaderboardRow>, BackendError> {
            Ok(vec![])
        }
        async fn count(&self, _: Option<&str>) -> Result<u32, BackendError> {
            Ok(1)
        }
    }

    async fn collect(resolver: &ProfileResolver, id: &str) -> Vec<Option<Profile>> {
        let mut seen = Vec::new();
        resolver.resolve(None, id, |p| seen.push(p)).await;
        seen
    }

    #[tokio::test]
    async fn test_fallback_then_remote_overwrites() {
        let remote = Profile::new("u1", Some("Mira".to_string()), Role::Community);
        let resolver = ProfileResolver::new(
            Arc::new(OneProfile(remote.clone())),
            Arc::new(FallbackStore::default()),
        );

        let seen = collect(&resolver, "u1").await;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].as_ref().map(|p| p.role), Some(Role::Authority));
        assert_eq!(seen[1], Some(remote));
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_fallback() {
        let resolver =
            ProfileResolver::new(Arc::new(Offline), Arc::new(FallbackStore::default()));
        let seen = collect(&resolver, "u1").await;
        assert_eq!(seen.len(), 1);
        assert!(seen[0].as_ref().is_some_and(|p| p.is_authority()));
    }

    #[tokio::test]
    async fn test_both_paths_empty() {
        let resolver = ProfileResolver::new(Arc::new(Offline), Arc::new(FallbackStore::new(false)));
        assert_eq!(collect(&resolver, "u1").await, vec![None]);
    }
}

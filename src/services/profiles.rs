//! User profile management

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{require_session, Session};
use crate::db::{tables, Database, Query};
use crate::error::{db_failure, AppError};
use crate::models::{OwnerSummary, Profile, ProfilePatch, ProfileRole};

/// Profile store operations
#[derive(Clone)]
pub struct ProfileService {
    db: Database,
}

impl ProfileService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a user profile by ID
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        self.db
            .fetch_one(tables::PROFILE, &Query::new().eq("id", user_id))
            .await
            .map_err(db_failure("load profile"))
    }

    /// Get or create the caller's profile (ensures profile exists)
    pub async fn ensure_profile(&self, session: Option<&Session>) -> Result<Profile, AppError> {
        let session = require_session(session)?;

        if let Some(profile) = self.get_profile(session.user_id).await? {
            return Ok(profile);
        }

        let now = Utc::now();
        let profile = Profile {
            id: session.user_id,
            name: session.name.clone(),
            image: session.image.clone(),
            role: ProfileRole::User,
            bio: None,
            location: None,
            created_at: now,
            updated_at: now,
        };

        let profile: Profile = match self.db.insert(tables::PROFILE, &profile).await {
            Ok(profile) => profile,
            // a concurrent first request created it between our read and insert
            Err(e) if e.is_conflict() => {
                debug!(user_id = %session.user_id, "Profile created concurrently, re-reading");
                return self
                    .get_profile(session.user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("profile {}", session.user_id)));
            }
            Err(e) => return Err(db_failure("create profile")(e)),
        };

        info!(user_id = %profile.id, "Profile created on first access");
        Ok(profile)
    }

    /// Update the caller's own profile
    pub async fn update_profile(
        &self,
        session: Option<&Session>,
        patch: ProfilePatch,
    ) -> Result<Profile, AppError> {
        let profile = self.ensure_profile(session).await?;
        let merged = profile.merge(patch, Utc::now());

        let updated: Profile = self
            .db
            .update_one(tables::PROFILE, &Query::new().eq("id", merged.id), &merged.to_update())
            .await
            .map_err(db_failure("update profile"))?;

        info!(user_id = %updated.id, role = ?updated.role, "Profile updated");
        Ok(updated)
    }

    /// Summaries for a set of users; users without a profile are skipped
    pub async fn summaries(&self, user_ids: &[Uuid]) -> Result<Vec<OwnerSummary>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles: Vec<Profile> = self
            .db
            .fetch(tables::PROFILE, &Query::new().one_of("id", user_ids))
            .await
            .map_err(db_failure("load profiles"))?;

        Ok(profiles.iter().map(Profile::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Backend, DbError, MemoryBackend};
    use crate::services::testing::session_for;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ensure_profile_requires_session() {
        let service = ProfileService::new(Database::in_memory());
        assert!(matches!(
            service.ensure_profile(None).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_once() {
        let service = ProfileService::new(Database::in_memory());
        let session = session_for("Ada");

        let created = service.ensure_profile(Some(&session)).await.unwrap();
        assert_eq!(created.id, session.user_id);
        assert_eq!(created.name.as_deref(), Some("Ada"));
        assert_eq!(created.role, ProfileRole::User);

        let again = service.ensure_profile(Some(&session)).await.unwrap();
        assert_eq!(again, created);

        let found = service.get_profile(session.user_id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    /// Hides the first read, as if another request inserted the row right after it
    struct RacedBackend {
        inner: MemoryBackend,
        first_read_done: AtomicBool,
    }

    #[async_trait]
    impl Backend for RacedBackend {
        async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DbError> {
            if !self.first_read_done.swap(true, Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            self.inner.select(table, query).await
        }

        async fn select_page(
            &self,
            table: &str,
            query: &Query,
        ) -> Result<(Vec<Value>, u64), DbError> {
            self.inner.select_page(table, query).await
        }

        async fn count(&self, table: &str, query: &Query) -> Result<u64, DbError> {
            self.inner.count(table, query).await
        }

        async fn insert(&self, table: &str, row: Value) -> Result<Value, DbError> {
            self.inner.insert(table, row).await
        }

        async fn update(
            &self,
            table: &str,
            query: &Query,
            patch: Value,
        ) -> Result<Vec<Value>, DbError> {
            self.inner.update(table, query, patch).await
        }
    }

    #[tokio::test]
    async fn test_ensure_profile_rereads_after_concurrent_create() {
        let session = session_for("Ada");
        let now = Utc::now();
        let existing = Profile {
            id: session.user_id,
            name: Some("Ada".to_string()),
            image: None,
            role: ProfileRole::Influencer,
            bio: Some("Created by the other request".to_string()),
            location: None,
            created_at: now,
            updated_at: now,
        };

        let inner = MemoryBackend::new();
        inner
            .insert(tables::PROFILE, serde_json::to_value(&existing).unwrap())
            .await
            .unwrap();
        let service = ProfileService::new(Database::new(Arc::new(RacedBackend {
            inner,
            first_read_done: AtomicBool::new(false),
        })));

        let profile = service.ensure_profile(Some(&session)).await.unwrap();
        assert_eq!(profile, existing);
    }

    #[tokio::test]
    async fn test_update_profile_merges() {
        let service = ProfileService::new(Database::in_memory());
        let session = session_for("Ada");

        let updated = service
            .update_profile(
                Some(&session),
                ProfilePatch {
                    role: Some(ProfileRole::Influencer),
                    bio: Some("Food and travel".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, ProfileRole::Influencer);
        assert_eq!(updated.bio.as_deref(), Some("Food and travel"));
        assert_eq!(updated.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_get_missing_profile_is_none() {
        let service = ProfileService::new(Database::in_memory());
        assert_eq!(service.get_profile(Uuid::new_v4()).await.unwrap(), None);
        assert!(service.summaries(&[]).await.unwrap().is_empty());
    }
}

//! User profile management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::merge_field;
use super::store::OwnerSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileRole {
    #[default]
    User,
    Influencer,
}

/// User profile; `id` is the auth user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: ProfileRole,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn summary(&self) -> OwnerSummary {
        OwnerSummary {
            id: self.id,
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }

    pub fn merge(mut self, patch: ProfilePatch, now: DateTime<Utc>) -> Profile {
        merge_field(&mut self.name, patch.name);
        merge_field(&mut self.image, patch.image);
        merge_field(&mut self.bio, patch.bio);
        merge_field(&mut self.location, patch.location);
        if let Some(role) = patch.role {
            self.role = role;
        }
        self.updated_at = now;
        self
    }

    pub fn to_update(&self) -> ProfileUpdate<'_> {
        ProfileUpdate {
            name: self.name.as_deref(),
            image: self.image.as_deref(),
            role: self.role,
            bio: self.bio.as_deref(),
            location: self.location.as_deref(),
            updated_at: self.updated_at,
        }
    }
}

/// Profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<ProfileRole>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate<'a> {
    pub name: Option<&'a str>,
    pub image: Option<&'a str>,
    pub role: ProfileRole,
    pub bio: Option<&'a str>,
    pub location: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

//! Store (business storefront) records

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{blank_to_none, merge_field};
use crate::db::SortOrder;

/// Store row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reg_number: Option<String>,
    pub year_established: Option<i32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub banner: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied fields for a new store.
///
/// `name` is optional here so a missing name surfaces as a validation
/// error rather than a body decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reg_number: Option<String>,
    pub year_established: Option<i32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub banner: Option<String>,
}

impl NewStore {
    /// Validate and build the row owned by `user_id`
    pub fn into_store(self, user_id: Uuid, now: DateTime<Utc>) -> Result<Store, String> {
        let name = blank_to_none(self.name).ok_or("Store name is required")?;
        validate_email(self.email.as_deref())?;
        validate_year(self.year_established, now)?;

        Ok(Store {
            id: Uuid::new_v4(),
            name,
            tagline: blank_to_none(self.tagline),
            description: blank_to_none(self.description),
            category: blank_to_none(self.category),
            reg_number: blank_to_none(self.reg_number),
            year_established: self.year_established,
            phone: blank_to_none(self.phone),
            email: blank_to_none(self.email),
            address: blank_to_none(self.address),
            city: blank_to_none(self.city),
            state: blank_to_none(self.state),
            country: blank_to_none(self.country),
            zip: blank_to_none(self.zip),
            website: blank_to_none(self.website),
            logo: blank_to_none(self.logo),
            banner: blank_to_none(self.banner),
            user_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial store update; absent or null fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePatch {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reg_number: Option<String>,
    pub year_established: Option<i32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub banner: Option<String>,
}

impl StorePatch {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Store name cannot be blank".to_string());
            }
        }
        validate_email(self.email.as_deref())?;
        validate_year(self.year_established, now)
    }
}

impl Store {
    /// Shallow merge: every field present in `patch` overwrites, the rest stay
    pub fn merge(mut self, patch: StorePatch, now: DateTime<Utc>) -> Store {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        merge_field(&mut self.tagline, patch.tagline);
        merge_field(&mut self.description, patch.description);
        merge_field(&mut self.category, patch.category);
        merge_field(&mut self.reg_number, patch.reg_number);
        if patch.year_established.is_some() {
            self.year_established = patch.year_established;
        }
        merge_field(&mut self.phone, patch.phone);
        merge_field(&mut self.email, patch.email);
        merge_field(&mut self.address, patch.address);
        merge_field(&mut self.city, patch.city);
        merge_field(&mut self.state, patch.state);
        merge_field(&mut self.country, patch.country);
        merge_field(&mut self.zip, patch.zip);
        merge_field(&mut self.website, patch.website);
        merge_field(&mut self.logo, patch.logo);
        merge_field(&mut self.banner, patch.banner);
        self.updated_at = now;
        self
    }

    /// Columns written back after a merge (identity, owner and creation time excluded)
    pub fn to_update(&self) -> StoreUpdate<'_> {
        StoreUpdate {
            name: &self.name,
            tagline: self.tagline.as_deref(),
            description: self.description.as_deref(),
            category: self.category.as_deref(),
            reg_number: self.reg_number.as_deref(),
            year_established: self.year_established,
            phone: self.phone.as_deref(),
            email: self.email.as_deref(),
            address: self.address.as_deref(),
            city: self.city.as_deref(),
            state: self.state.as_deref(),
            country: self.country.as_deref(),
            zip: self.zip.as_deref(),
            website: self.website.as_deref(),
            logo: self.logo.as_deref(),
            banner: self.banner.as_deref(),
            updated_at: self.updated_at,
        }
    }
}

/// Full-row write for a merged store
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate<'a> {
    pub name: &'a str,
    pub tagline: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub reg_number: Option<&'a str>,
    pub year_established: Option<i32>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub country: Option<&'a str>,
    pub zip: Option<&'a str>,
    pub website: Option<&'a str>,
    pub logo: Option<&'a str>,
    pub banner: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

/// Owner summary joined from the owner's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Store detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetails {
    #[serde(flatten)]
    pub store: Store,
    pub owner: Option<OwnerSummary>,
    pub product_count: u64,
}

/// Sortable store columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoreSortField {
    #[serde(rename = "name")]
    Name,
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl StoreSortField {
    pub fn column(&self) -> &'static str {
        match self {
            StoreSortField::Name => "name",
            StoreSortField::CreatedAt => "createdAt",
        }
    }
}

/// Store list query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub sort_by: StoreSortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn validate_email(email: Option<&str>) -> Result<(), String> {
    match email.map(str::trim) {
        Some(email) if !email.is_empty() && !email.contains('@') => {
            Err(format!("Invalid email address: {}", email))
        }
        _ => Ok(()),
    }
}

fn validate_year(year: Option<i32>, now: DateTime<Utc>) -> Result<(), String> {
    match year {
        Some(year) if year > now.year() => {
            Err(format!("Year established cannot be in the future: {}", year))
        }
        _ => Ok(()),
    }
}

//! Campaign records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{blank_to_none, merge_field};
use crate::db::SortOrder;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Campaign lifecycle status. Transitions are not enforced; the store
/// owner may set any status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Published,
    Active,
    Completed,
}

impl CampaignStatus {
    /// Whether influencers may still apply
    pub fn accepts_applications(&self) -> bool {
        matches!(self, CampaignStatus::Published | CampaignStatus::Active)
    }
}

/// Campaign row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub currency: String,
    pub status: CampaignStatus,
    #[serde(rename = "type")]
    pub campaign_type: Option<String>,
    /// Length in days
    pub duration: Option<i32>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    pub store_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub store_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<CampaignStatus>,
    #[serde(rename = "type")]
    pub campaign_type: Option<String>,
    pub duration: Option<i32>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl NewCampaign {
    pub fn into_campaign(self, store_id: Uuid, now: DateTime<Utc>) -> Result<Campaign, String> {
        let title = blank_to_none(self.title).ok_or("Campaign title is required")?;
        validate_budget(self.budget)?;
        validate_duration(self.duration)?;

        Ok(Campaign {
            id: Uuid::new_v4(),
            title,
            description: blank_to_none(self.description),
            budget: self.budget,
            currency: normalize_currency(self.currency),
            status: self.status.unwrap_or_default(),
            campaign_type: blank_to_none(self.campaign_type),
            duration: self.duration,
            platforms: clean_list(self.platforms),
            targets: clean_list(self.targets),
            store_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial campaign update; the owning store and status are not patchable here
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub campaign_type: Option<String>,
    pub duration: Option<i32>,
    pub platforms: Option<Vec<String>>,
    pub targets: Option<Vec<String>>,
}

impl CampaignPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("Campaign title cannot be blank".to_string());
            }
        }
        validate_budget(self.budget)?;
        validate_duration(self.duration)
    }
}

impl Campaign {
    pub fn merge(mut self, patch: CampaignPatch, now: DateTime<Utc>) -> Campaign {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        merge_field(&mut self.description, patch.description);
        if patch.budget.is_some() {
            self.budget = patch.budget;
        }
        if patch.currency.is_some() {
            self.currency = normalize_currency(patch.currency);
        }
        merge_field(&mut self.campaign_type, patch.campaign_type);
        if patch.duration.is_some() {
            self.duration = patch.duration;
        }
        if let Some(platforms) = patch.platforms {
            self.platforms = clean_list(platforms);
        }
        if let Some(targets) = patch.targets {
            self.targets = clean_list(targets);
        }
        self.updated_at = now;
        self
    }

    pub fn to_update(&self) -> CampaignUpdate<'_> {
        CampaignUpdate {
            title: &self.title,
            description: self.description.as_deref(),
            budget: self.budget,
            currency: &self.currency,
            campaign_type: self.campaign_type.as_deref(),
            duration: self.duration,
            platforms: &self.platforms,
            targets: &self.targets,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub budget: Option<f64>,
    pub currency: &'a str,
    #[serde(rename = "type")]
    pub campaign_type: Option<&'a str>,
    pub duration: Option<i32>,
    pub platforms: &'a [String],
    pub targets: &'a [String],
    pub updated_at: DateTime<Utc>,
}

/// Status-only write
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStatusUpdate {
    pub status: CampaignStatus,
    pub updated_at: DateTime<Utc>,
}

/// Campaign detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetails {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub application_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CampaignSortField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "budget")]
    Budget,
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl CampaignSortField {
    pub fn column(&self) -> &'static str {
        match self {
            CampaignSortField::Title => "title",
            CampaignSortField::Budget => "budget",
            CampaignSortField::CreatedAt => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<CampaignStatus>,
    pub store_id: Option<Uuid>,
    #[serde(default)]
    pub sort_by: CampaignSortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn normalize_currency(currency: Option<String>) -> String {
    blank_to_none(currency)
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !cleaned.iter().any(|v| v == value) {
            cleaned.push(value.to_string());
        }
    }
    cleaned
}

fn validate_budget(budget: Option<f64>) -> Result<(), String> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err("Budget must be a non-negative amount".to_string()),
        _ => Ok(()),
    }
}

fn validate_duration(duration: Option<i32>) -> Result<(), String> {
    match duration {
        Some(d) if d <= 0 => Err("Duration must be at least one day".to_string()),
        _ => Ok(()),
    }
}

//! Influencer applications to campaigns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::OwnerSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Selected,
    Rejected,
}

impl ApplicationStatus {
    /// Label shown in the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "pending",
            ApplicationStatus::Selected => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Application row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub influencer_id: Uuid,
    pub message: Option<String>,
    pub application_status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of an apply request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusUpdate {
    pub application_status: ApplicationStatus,
    pub updated_at: DateTime<Utc>,
}

/// Application as listed to store owners and influencers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub status_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influencer: Option<OwnerSummary>,
}

impl ApplicationView {
    pub fn new(application: Application, influencer: Option<OwnerSummary>) -> Self {
        Self {
            status_label: application.application_status.label().to_string(),
            application,
            influencer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(ApplicationStatus::Applied.label(), "pending");
        assert_eq!(ApplicationStatus::Selected.label(), "approved");
        assert_eq!(ApplicationStatus::Rejected.label(), "rejected");
    }

    #[test]
    fn test_view_serializes_label() {
        let now = Utc::now();
        let view = ApplicationView::new(
            Application {
                id: Uuid::new_v4(),
                campaign_id: Uuid::new_v4(),
                influencer_id: Uuid::new_v4(),
                message: None,
                application_status: ApplicationStatus::Selected,
                created_at: now,
                updated_at: now,
            },
            None,
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["applicationStatus"], "SELECTED");
        assert_eq!(json["statusLabel"], "approved");
        assert!(json.get("influencer").is_none());

        let decoded: ApplicationView = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, view);
    }
}

//! Influencer applications to campaigns

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::campaigns::CampaignService;
use super::profiles::ProfileService;
use crate::auth::{require_session, Session};
use crate::db::{tables, Database, Query, SortOrder};
use crate::error::{db_failure, AppError};
use crate::models::application::ApplicationStatusUpdate;
use crate::models::{Application, ApplicationStatus, ApplicationView, NewApplication, ProfileRole};

#[derive(Clone)]
pub struct ApplicationService {
    db: Database,
    campaigns: CampaignService,
    profiles: ProfileService,
}

impl ApplicationService {
    pub fn new(db: Database, campaigns: CampaignService, profiles: ProfileService) -> Self {
        Self {
            db,
            campaigns,
            profiles,
        }
    }

    /// Apply to a published or active campaign as an influencer
    pub async fn apply_to_campaign(
        &self,
        session: Option<&Session>,
        campaign_id: Uuid,
        input: NewApplication,
    ) -> Result<ApplicationView, AppError> {
        let session = require_session(session)?;
        let profile = self.profiles.ensure_profile(Some(session)).await?;
        if profile.role != ProfileRole::Influencer {
            return Err(AppError::Forbidden(
                "only influencer profiles can apply to campaigns".to_string(),
            ));
        }

        let campaign = self
            .campaigns
            .find(campaign_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campaign {}", campaign_id)))?;
        if !campaign.status.accepts_applications() {
            return Err(AppError::validation(
                "this campaign is not accepting applications",
            ));
        }

        let existing = self
            .db
            .count(
                tables::APPLICATION,
                &Query::new()
                    .eq("campaignId", campaign_id)
                    .eq("influencerId", session.user_id),
            )
            .await
            .map_err(db_failure("check existing applications"))?;
        if existing > 0 {
            return Err(AppError::Conflict(
                "you have already applied to this campaign".to_string(),
            ));
        }

        let now = Utc::now();
        let application = Application {
            id: Uuid::new_v4(),
            campaign_id,
            influencer_id: session.user_id,
            message: crate::models::blank_to_none(input.message),
            application_status: ApplicationStatus::Applied,
            created_at: now,
            updated_at: now,
        };
        let application: Application = self
            .db
            .insert(tables::APPLICATION, &application)
            .await
            .map_err(db_failure("create application"))?;

        info!(
            application_id = %application.id,
            campaign_id = %campaign_id,
            influencer_id = %session.user_id,
            "Application submitted"
        );
        Ok(ApplicationView::new(application, Some(profile.summary())))
    }

    /// Applications to a campaign, for the owner of its store
    pub async fn get_campaign_applications(
        &self,
        session: Option<&Session>,
        campaign_id: Uuid,
    ) -> Result<Vec<ApplicationView>, AppError> {
        let session = require_session(session)?;
        self.campaigns.owned_campaign(session, campaign_id).await?;

        let applications: Vec<Application> = self
            .db
            .fetch(
                tables::APPLICATION,
                &Query::new()
                    .eq("campaignId", campaign_id)
                    .order_by("createdAt", SortOrder::Desc),
            )
            .await
            .map_err(db_failure("load campaign applications"))?;

        let influencer_ids: Vec<Uuid> = applications.iter().map(|a| a.influencer_id).collect();
        let influencers: HashMap<Uuid, _> = self
            .profiles
            .summaries(&influencer_ids)
            .await?
            .into_iter()
            .map(|summary| (summary.id, summary))
            .collect();

        Ok(applications
            .into_iter()
            .map(|application| {
                let influencer = influencers.get(&application.influencer_id).cloned();
                ApplicationView::new(application, influencer)
            })
            .collect())
    }

    /// The caller's own applications, newest first
    pub async fn get_my_applications(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<ApplicationView>, AppError> {
        let session = require_session(session)?;

        let applications: Vec<Application> = self
            .db
            .fetch(
                tables::APPLICATION,
                &Query::new()
                    .eq("influencerId", session.user_id)
                    .order_by("createdAt", SortOrder::Desc),
            )
            .await
            .map_err(db_failure("load applications"))?;

        Ok(applications
            .into_iter()
            .map(|application| ApplicationView::new(application, None))
            .collect())
    }

    /// Select or reject an applicant; only the campaign's store owner may
    pub async fn update_application_status(
        &self,
        session: Option<&Session>,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<ApplicationView, AppError> {
        let session = require_session(session)?;

        let application: Application = self
            .db
            .fetch_one(tables::APPLICATION, &Query::new().eq("id", application_id))
            .await
            .map_err(db_failure("load application"))?
            .ok_or_else(|| AppError::NotFound(format!("application {}", application_id)))?;

        self.campaigns
            .owned_campaign(session, application.campaign_id)
            .await?;

        let update = ApplicationStatusUpdate {
            application_status: status,
            updated_at: Utc::now(),
        };
        let updated: Application = self
            .db
            .update_one(tables::APPLICATION, &Query::new().eq("id", application_id), &update)
            .await
            .map_err(db_failure("update application status"))?;

        info!(
            application_id = %application_id,
            status = updated.application_status.label(),
            "Application status changed"
        );
        Ok(ApplicationView::new(updated, None))
    }
}

//! Campaign data-access

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::pagination::{PageLimits, PageRequest, Pagination};
use super::stores::StoreService;
use crate::auth::{require_session, Session};
use crate::db::{tables, Database, Query, SortOrder};
use crate::error::{db_failure, AppError};
use crate::models::campaign::CampaignStatusUpdate;
use crate::models::{
    Campaign, CampaignDetails, CampaignListParams, CampaignPatch, CampaignStatus, NewCampaign,
};

const SEARCH_COLUMNS: [&str; 2] = ["title", "description"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignPage {
    pub campaigns: Vec<Campaign>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct CampaignService {
    db: Database,
    stores: StoreService,
    limits: PageLimits,
}

impl CampaignService {
    pub fn new(db: Database, stores: StoreService, limits: PageLimits) -> Self {
        Self { db, stores, limits }
    }

    /// Create a campaign for a store the caller owns
    pub async fn create_campaign(
        &self,
        session: Option<&Session>,
        input: NewCampaign,
    ) -> Result<Campaign, AppError> {
        let session = require_session(session)?;
        let store_id = input
            .store_id
            .ok_or_else(|| AppError::validation("storeId is required"))?;
        let campaign = input
            .into_campaign(store_id, Utc::now())
            .map_err(AppError::Validation)?;

        self.stores.owned_store(session, store_id).await?;

        let campaign: Campaign = self
            .db
            .insert(tables::CAMPAIGN, &campaign)
            .await
            .map_err(db_failure("create campaign"))?;

        info!(
            campaign_id = %campaign.id,
            store_id = %store_id,
            status = ?campaign.status,
            "Campaign created"
        );
        Ok(campaign)
    }

    /// Campaign with its application count, `None` when absent
    pub async fn get_campaign_by_id(&self, id: Uuid) -> Result<Option<CampaignDetails>, AppError> {
        let Some(campaign) = self.find(id).await? else {
            return Ok(None);
        };

        let application_count = self
            .db
            .count(tables::APPLICATION, &Query::new().eq("campaignId", id))
            .await
            .map_err(db_failure("count campaign applications"))?;

        Ok(Some(CampaignDetails {
            campaign,
            application_count,
        }))
    }

    /// Public listing; drafts are never included
    pub async fn get_campaigns(&self, params: CampaignListParams) -> Result<CampaignPage, AppError> {
        let page = PageRequest::normalize(params.page, params.limit, self.limits);

        let mut query = match params.status {
            Some(CampaignStatus::Draft) => {
                return Err(AppError::validation(
                    "draft campaigns are only listed for their store owner",
                ))
            }
            Some(status) => Query::new().eq("status", status),
            None => Query::new().neq("status", CampaignStatus::Draft),
        };
        if let Some(store_id) = params.store_id {
            query = query.eq("storeId", store_id);
        }
        if let Some(search) = params.search.as_deref() {
            query = query.contains_any(&SEARCH_COLUMNS, search);
        }
        let query = query
            .order_by(params.sort_by.column(), params.sort_order)
            .order_by("id", SortOrder::Asc)
            .offset(page.skip())
            .limit(u64::from(page.limit));

        let (campaigns, total) = self
            .db
            .fetch_page::<Campaign>(tables::CAMPAIGN, &query)
            .await
            .map_err(db_failure("list campaigns"))?;

        debug!(total, page = page.page, "Listed campaigns");
        Ok(CampaignPage {
            campaigns,
            pagination: Pagination::new(total, page),
        })
    }

    /// All campaigns of a store the caller owns, drafts included
    pub async fn get_store_campaigns(
        &self,
        session: Option<&Session>,
        store_id: Uuid,
    ) -> Result<Vec<Campaign>, AppError> {
        let session = require_session(session)?;
        self.stores.owned_store(session, store_id).await?;

        let query = Query::new()
            .eq("storeId", store_id)
            .order_by("createdAt", SortOrder::Desc);
        self.db
            .fetch(tables::CAMPAIGN, &query)
            .await
            .map_err(db_failure("load store campaigns"))
    }

    /// Shallow-merge a patch over a campaign the caller owns
    pub async fn append_campaign_details(
        &self,
        session: Option<&Session>,
        id: Uuid,
        patch: CampaignPatch,
    ) -> Result<Campaign, AppError> {
        let session = require_session(session)?;
        patch.validate().map_err(AppError::Validation)?;

        let existing = self.owned_campaign(session, id).await?;
        let merged = existing.merge(patch, Utc::now());

        let campaign: Campaign = self
            .db
            .update_one(tables::CAMPAIGN, &Query::new().eq("id", id), &merged.to_update())
            .await
            .map_err(db_failure("update campaign"))?;

        info!(campaign_id = %id, "Campaign details updated");
        Ok(campaign)
    }

    /// Set any status; the lifecycle is not enforced
    pub async fn update_campaign_status(
        &self,
        session: Option<&Session>,
        id: Uuid,
        status: CampaignStatus,
    ) -> Result<Campaign, AppError> {
        let session = require_session(session)?;
        let existing = self.owned_campaign(session, id).await?;

        let update = CampaignStatusUpdate {
            status,
            updated_at: Utc::now(),
        };
        let campaign: Campaign = self
            .db
            .update_one(tables::CAMPAIGN, &Query::new().eq("id", id), &update)
            .await
            .map_err(db_failure("update campaign status"))?;

        info!(campaign_id = %id, from = ?existing.status, to = ?status, "Campaign status changed");
        Ok(campaign)
    }

    /// Campaign whose store the caller owns
    pub async fn owned_campaign(&self, session: &Session, id: Uuid) -> Result<Campaign, AppError> {
        let campaign = self
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campaign {}", id)))?;
        self.stores.owned_store(session, campaign.store_id).await?;
        Ok(campaign)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        self.db
            .fetch_one(tables::CAMPAIGN, &Query::new().eq("id", id))
            .await
            .map_err(db_failure("load campaign"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignSortField, NewStore};
    use crate::services::testing::{session_for, Fixture};

    async fn store_for(fx: &Fixture, owner: &Session) -> Uuid {
        fx.stores
            .create_store(
                Some(owner),
                NewStore {
                    name: Some("Glow Cosmetics".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    fn new_campaign(store_id: Uuid, title: &str, status: Option<CampaignStatus>) -> NewCampaign {
        NewCampaign {
            store_id: Some(store_id),
            title: Some(title.to_string()),
            status,
            budget: Some(1000.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_campaign_requires_owned_store() {
        let fx = Fixture::new();
        let owner = session_for("Owner");
        let stranger = session_for("Stranger");
        let store_id = store_for(&fx, &owner).await;

        assert!(matches!(
            fx.campaigns.create_campaign(None, new_campaign(store_id, "Launch", None)).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            fx.campaigns
                .create_campaign(Some(&stranger), new_campaign(store_id, "Launch", None))
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            fx.campaigns
                .create_campaign(Some(&owner), new_campaign(Uuid::new_v4(), "Launch", None))
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            fx.campaigns
                .create_campaign(
                    Some(&owner),
                    NewCampaign {
                        title: Some("No store".into()),
                        ..Default::default()
                    }
                )
                .await,
            Err(AppError::Validation(_))
        ));

        let campaign = fx
            .campaigns
            .create_campaign(Some(&owner), new_campaign(store_id, "Launch", None))
            .await
            .unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);

        let details = fx.campaigns.get_campaign_by_id(campaign.id).await.unwrap().unwrap();
        assert_eq!(details.campaign, campaign);
        assert_eq!(details.application_count, 0);
    }

    #[tokio::test]
    async fn test_public_listing_hides_drafts() {
        let fx = Fixture::new();
        let owner = session_for("Owner");
        let store_id = store_for(&fx, &owner).await;

        for (title, status) in [
            ("Secret draft", CampaignStatus::Draft),
            ("Spring sale", CampaignStatus::Published),
            ("Summer promo", CampaignStatus::Active),
        ] {
            fx.campaigns
                .create_campaign(Some(&owner), new_campaign(store_id, title, Some(status)))
                .await
                .unwrap();
        }

        let page = fx
            .campaigns
            .get_campaigns(CampaignListParams {
                sort_by: CampaignSortField::Title,
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<_> = page.campaigns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Spring sale", "Summer promo"]);
        assert_eq!(page.pagination.total, 2);

        let active = fx
            .campaigns
            .get_campaigns(CampaignListParams {
                status: Some(CampaignStatus::Active),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.campaigns.len(), 1);

        assert!(matches!(
            fx.campaigns
                .get_campaigns(CampaignListParams {
                    status: Some(CampaignStatus::Draft),
                    ..Default::default()
                })
                .await,
            Err(AppError::Validation(_))
        ));

        let own = fx.campaigns.get_store_campaigns(Some(&owner), store_id).await.unwrap();
        assert_eq!(own.len(), 3);
    }

    #[tokio::test]
    async fn test_status_can_move_freely() {
        let fx = Fixture::new();
        let owner = session_for("Owner");
        let store_id = store_for(&fx, &owner).await;
        let campaign = fx
            .campaigns
            .create_campaign(Some(&owner), new_campaign(store_id, "Launch", None))
            .await
            .unwrap();

        for status in [
            CampaignStatus::Completed,
            CampaignStatus::Draft,
            CampaignStatus::Active,
        ] {
            let updated = fx
                .campaigns
                .update_campaign_status(Some(&owner), campaign.id, status)
                .await
                .unwrap();
            assert_eq!(updated.status, status);
        }

        let stranger = session_for("Stranger");
        assert!(matches!(
            fx.campaigns
                .update_campaign_status(Some(&stranger), campaign.id, CampaignStatus::Draft)
                .await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_append_campaign_details() {
        let fx = Fixture::new();
        let owner = session_for("Owner");
        let store_id = store_for(&fx, &owner).await;
        let campaign = fx
            .campaigns
            .create_campaign(Some(&owner), new_campaign(store_id, "Launch", None))
            .await
            .unwrap();

        let updated = fx
            .campaigns
            .append_campaign_details(
                Some(&owner),
                campaign.id,
                CampaignPatch {
                    description: Some("Unboxing videos".into()),
                    duration: Some(14),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.description.as_deref(), Some("Unboxing videos"));
        assert_eq!(updated.duration, Some(14));
        assert_eq!(updated.budget, Some(1000.0));
        assert_eq!(updated.title, "Launch");
        assert_eq!(updated.store_id, store_id);
    }
}

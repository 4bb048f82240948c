//! Store data-access: creation, lookup, filtered listing and detail merges

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::pagination::{PageLimits, PageRequest, Pagination};
use super::profiles::ProfileService;
use crate::auth::{require_session, Session};
use crate::db::{tables, Database, Query, SortOrder};
use crate::error::{db_failure, AppError};
use crate::models::{NewStore, Store, StoreDetails, StoreListParams, StorePatch};

/// Columns the store search matches against
const SEARCH_COLUMNS: [&str; 3] = ["name", "description", "tagline"];

/// One page of stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct StoreService {
    db: Database,
    profiles: ProfileService,
    limits: PageLimits,
}

impl StoreService {
    pub fn new(db: Database, profiles: ProfileService, limits: PageLimits) -> Self {
        Self {
            db,
            profiles,
            limits,
        }
    }

    /// Create a store owned by the caller
    pub async fn create_store(
        &self,
        session: Option<&Session>,
        input: NewStore,
    ) -> Result<Store, AppError> {
        let session = require_session(session)?;
        let store = input
            .into_store(session.user_id, Utc::now())
            .map_err(AppError::Validation)?;

        let store: Store = self
            .db
            .insert(tables::STORE, &store)
            .await
            .map_err(db_failure("create store"))?;

        info!(store_id = %store.id, user_id = %session.user_id, "Store created");
        Ok(store)
    }

    /// Store with owner summary and product count, `None` when absent
    pub async fn get_store_by_id(&self, id: Uuid) -> Result<Option<StoreDetails>, AppError> {
        let Some(store) = self.find(id).await? else {
            debug!(store_id = %id, "Store not found");
            return Ok(None);
        };

        let owner_query = self.profiles.get_profile(store.user_id);
        let product_count = async {
            self.db
                .count(tables::PRODUCT, &Query::new().eq("storeId", id))
                .await
                .map_err(db_failure("count store products"))
        };
        let (owner, product_count) = futures::try_join!(owner_query, product_count)?;

        Ok(Some(StoreDetails {
            owner: owner.map(|p| p.summary()),
            product_count,
            store,
        }))
    }

    /// Filtered, sorted, paginated store listing
    pub async fn get_stores(&self, params: StoreListParams) -> Result<StorePage, AppError> {
        let page = PageRequest::normalize(params.page, params.limit, self.limits);

        let mut query = Query::new();
        if let Some(search) = params.search.as_deref() {
            query = query.contains_any(&SEARCH_COLUMNS, search);
        }
        if let Some(category) = params.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                query = query.eq("category", category);
            }
        }
        let query = query
            .order_by(params.sort_by.column(), params.sort_order)
            .order_by("id", SortOrder::Asc)
            .offset(page.skip())
            .limit(u64::from(page.limit));

        let (stores, total) = self
            .db
            .fetch_page::<Store>(tables::STORE, &query)
            .await
            .map_err(db_failure("list stores"))?;

        debug!(total, page = page.page, returned = stores.len(), "Listed stores");
        Ok(StorePage {
            stores,
            pagination: Pagination::new(total, page),
        })
    }

    /// Every store owned by the caller, newest first
    pub async fn get_all_user_stores(&self, session: Option<&Session>) -> Result<Vec<Store>, AppError> {
        let session = require_session(session)?;
        let query = Query::new()
            .eq("userId", session.user_id)
            .order_by("createdAt", SortOrder::Desc);

        self.db
            .fetch(tables::STORE, &query)
            .await
            .map_err(db_failure("load user stores"))
    }

    /// Read the store, merge the patch over it and write the result back.
    /// Concurrent patches are last-write-wins.
    pub async fn append_store_details(
        &self,
        session: Option<&Session>,
        id: Uuid,
        patch: StorePatch,
    ) -> Result<Store, AppError> {
        let session = require_session(session)?;
        let now = Utc::now();
        patch.validate(now).map_err(AppError::Validation)?;

        let existing = self.owned_store(session, id).await?;
        let merged = existing.merge(patch, now);

        let store: Store = self
            .db
            .update_one(tables::STORE, &Query::new().eq("id", id), &merged.to_update())
            .await
            .map_err(db_failure("update store"))?;

        info!(store_id = %id, user_id = %session.user_id, "Store details updated");
        Ok(store)
    }

    /// Store owned by the caller; 404 when absent, 403 when someone else's
    pub async fn owned_store(&self, session: &Session, id: Uuid) -> Result<Store, AppError> {
        let store = self
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("store {}", id)))?;

        if store.user_id != session.user_id {
            warn!(store_id = %id, user_id = %session.user_id, "Rejected access to another user's store");
            return Err(AppError::Forbidden("you do not own this store".to_string()));
        }
        Ok(store)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Store>, AppError> {
        self.db
            .fetch_one(tables::STORE, &Query::new().eq("id", id))
            .await
            .map_err(db_failure("load store"))
    }
}

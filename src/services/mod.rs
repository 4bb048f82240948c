//! Data-access functions: session guard, validation, then database calls

pub mod applications;
pub mod campaigns;
pub mod pagination;
pub mod profiles;
pub mod stores;

pub use applications::ApplicationService;
pub use campaigns::{CampaignPage, CampaignService};
pub use pagination::{PageLimits, PageRequest, Pagination};
pub use profiles::ProfileService;
pub use stores::{StorePage, StoreService};

use crate::db::Database;

/// Every data service wired to one database handle
#[derive(Clone)]
pub struct Services {
    pub profiles: ProfileService,
    pub stores: StoreService,
    pub campaigns: CampaignService,
    pub applications: ApplicationService,
}

impl Services {
    pub fn new(db: Database, limits: PageLimits) -> Self {
        let profiles = ProfileService::new(db.clone());
        let stores = StoreService::new(db.clone(), profiles.clone(), limits);
        let campaigns = CampaignService::new(db.clone(), stores.clone(), limits);
        let applications = ApplicationService::new(db, campaigns.clone(), profiles.clone());

        Self {
            profiles,
            stores,
            campaigns,
            applications,
        }
    }
}

//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, ConfigError, DataBackend};
use crate::db::{Database, SupabaseClient};
use crate::services::{PageLimits, Services};
use crate::util::rate_limit::{create_write_limiter, WriteLimiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub services: Services,
    pub write_limiter: Arc<WriteLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let db = match config.data_backend {
            DataBackend::Supabase => {
                let supabase = config
                    .supabase
                    .as_ref()
                    .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                info!(url = %supabase.url, "Using Supabase backend");
                Database::new(Arc::new(SupabaseClient::new(supabase)))
            }
            DataBackend::Memory => {
                info!("Using in-memory backend; data is lost on restart");
                Database::in_memory()
            }
        };

        Ok(Self::with_database(config, db))
    }

    /// State over an explicit database handle
    pub fn with_database(config: Config, db: Database) -> Self {
        let limits = PageLimits {
            default_limit: config.default_page_limit,
            max_limit: config.max_page_limit,
        };

        Self {
            services: Services::new(db, limits),
            write_limiter: create_write_limiter(config.write_rate_limit),
            config: Arc::new(config),
        }
    }
}

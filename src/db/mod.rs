//! Database gateway: PostgREST (Supabase) or in-memory backends behind one handle

pub mod backend;
pub mod memory;
pub mod query;
pub mod supabase;

pub use backend::{Backend, Database, DbError};
pub use memory::MemoryBackend;
pub use query::{Query, SortOrder};
pub use supabase::SupabaseClient;

/// Table names, as defined by the relational schema
pub mod tables {
    pub const STORE: &str = "Store";
    pub const CAMPAIGN: &str = "Campaign";
    pub const APPLICATION: &str = "Application";
    pub const PROFILE: &str = "Profile";
    pub const PRODUCT: &str = "Product";
}

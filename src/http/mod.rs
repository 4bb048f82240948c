//! HTTP layer

pub mod response;
pub mod routes;

pub use response::ApiResponse;
pub use routes::build_router;

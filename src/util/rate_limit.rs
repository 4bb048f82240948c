//! Rate limiting utilities

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::Session;
use crate::error::AppError;

/// Keyed by caller; anonymous callers share the `None` bucket
pub type WriteLimiter = DefaultKeyedRateLimiter<Option<Uuid>>;

/// Create a keyed limiter with the specified requests per second
pub fn create_write_limiter(requests_per_second: u32) -> Arc<WriteLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Periodically forget callers whose buckets have refilled so the key map
/// does not grow with every user ever seen
pub fn spawn_limiter_housekeeping(limiter: Arc<WriteLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(before, after = limiter.len(), "Pruned write limiter keys");
        }
    })
}

fn is_write(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Middleware throttling mutating requests per caller.
/// Must run after `resolve_session` so the caller is known.
pub async fn limit_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_write(request.method()) {
        let key = request.extensions().get::<Session>().map(|s| s.user_id);
        if state.write_limiter.check_key(&key).is_err() {
            warn!(user_id = ?key, path = %request.uri().path(), "Write rate limit exceeded");
            return AppError::RateLimited.into_response();
        }
    }

    next.run(request).await
}

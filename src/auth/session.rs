//! Request-scoped session resolution and the session guard

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use tracing::debug;
use uuid::Uuid;

use super::jwt::{verify_jwt, JwtClaims};
use crate::app::AppState;
use crate::error::AppError;

/// Cookie the web client stores the Supabase access token in
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// The signed-in caller
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl From<JwtClaims> for Session {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.user_metadata.display_name(),
            image: claims.user_metadata.avatar(),
            email: claims.email,
        }
    }
}

/// Session guard called at the top of every user-scoped data function
pub fn require_session(session: Option<&Session>) -> Result<&Session, AppError> {
    session.ok_or(AppError::Unauthorized)
}

/// Access token from the bearer header, falling back to the auth cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Middleware attaching a `Session` to the request when a valid token is
/// present. Requests without one pass through; the data functions decide
/// whether a session is required.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match verify_jwt(&token, &state.config.jwt_secret) {
            Ok(claims) => {
                request.extensions_mut().insert(Session::from(claims));
            }
            Err(e) => {
                debug!(error = %e, "Ignoring invalid session token");
            }
        }
    }

    next.run(request).await
}

/// Extractor for the optional session attached by `resolve_session`
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}

//! Authentication: Supabase token verification and per-request sessions

pub mod jwt;
pub mod session;

pub use jwt::{verify_jwt, AuthError, JwtClaims};
pub use session::{require_session, resolve_session, MaybeSession, Session};

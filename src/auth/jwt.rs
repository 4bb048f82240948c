//! Supabase access token (HS256 JWT) verification

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Audience Supabase stamps on signed-in user tokens
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

/// JWT claims from Supabase auth token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Audience
    #[serde(default)]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
    /// Profile data from the identity provider
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Identity-provider metadata; field names differ between providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserMetadata {
    pub fn display_name(&self) -> Option<String> {
        self.full_name.clone().or_else(|| self.name.clone())
    }

    pub fn avatar(&self) -> Option<String> {
        self.avatar_url.clone().or_else(|| self.picture.clone())
    }
}

/// Verify a JWT token and extract claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let header: JwtHeader = decode_segment(header_b64)?;
    if header.alg != "HS256" {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    // Verify signature (HMAC-SHA256)
    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    let claims: JwtClaims = decode_segment(payload_b64)?;

    if claims.exp < chrono::Utc::now().timestamp() {
        return Err(AuthError::TokenExpired);
    }

    if let Some(aud) = &claims.aud {
        if aud != AUTHENTICATED_AUDIENCE {
            return Err(AuthError::InvalidAudience);
        }
    }

    Ok(claims)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let json = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)
}

/// Sign claims the way Supabase does; used to mint tokens in tests
#[cfg(test)]
pub(crate) fn sign_jwt(claims: &JwtClaims, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", header, payload).as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{}.{}.{}", header, payload, signature)
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid audience")]
    InvalidAudience,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    pub(crate) fn claims_for(user_id: Uuid) -> JwtClaims {
        JwtClaims {
            sub: user_id,
            aud: Some(AUTHENTICATED_AUDIENCE.to_string()),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
            email: Some("ada@example.com".to_string()),
            role: Some("authenticated".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("Ada Obi".to_string()),
                avatar_url: Some("https://cdn.example/ada.png".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_valid_token_round_trips_claims() {
        let user_id = Uuid::new_v4();
        let token = sign_jwt(&claims_for(user_id), SECRET);
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.user_metadata.display_name().as_deref(), Some("Ada Obi"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_jwt(&claims_for(Uuid::new_v4()), SECRET);
        assert!(matches!(
            verify_jwt(&token, "another-secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut claims = claims_for(Uuid::new_v4());
        claims.exp = chrono::Utc::now().timestamp() - 10;
        let token = sign_jwt(&claims, SECRET);
        assert!(matches!(verify_jwt(&token, SECRET), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let mut claims = claims_for(Uuid::new_v4());
        claims.aud = Some("anon".to_string());
        let token = sign_jwt(&claims, SECRET);
        assert!(matches!(verify_jwt(&token, SECRET), Err(AuthError::InvalidAudience)));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(verify_jwt("", SECRET).is_err());
        assert!(verify_jwt("a.b", SECRET).is_err());
        assert!(verify_jwt("a.b.c.d", SECRET).is_err());

        let none_alg = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#)
        );
        assert!(matches!(
            verify_jwt(&none_alg, SECRET),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
    }
}

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Verifies bearer tokens on the analyze path. Authentication is optional
/// there: a missing or invalid token means the request proceeds as a guest,
/// it is never rejected outright.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        TokenVerifier {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Returns the authenticated user id, or None to continue as a guest.
    pub fn user_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?;
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims.user_id),
            Err(err) => {
                tracing::debug!("bearer token rejected, continuing as guest: {}", err);
                None
            }
        }
    }
}

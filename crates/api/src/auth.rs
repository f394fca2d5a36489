//! Bearer JWT issuance and validation.
//!
//! Replaces the teacher's Telegram `initData` HMAC check with a standard
//! JWT bearer token: the API mints one on a successful Google OAuth
//! callback and every other route validates it the same way the teacher
//! validated Telegram signatures -- as an `axum` extractor, not a
//! hand-rolled header parse in each handler.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{StatusCode, request::Parts};
use eventline_core::config::CoreConfig;
use eventline_core::types::UserId;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    exp: usize,
}

fn algorithm(config: &CoreConfig) -> jsonwebtoken::Algorithm {
    match config.jwt_algorithm.as_str() {
        "HS384" => jsonwebtoken::Algorithm::HS384,
        "HS512" => jsonwebtoken::Algorithm::HS512,
        _ => jsonwebtoken::Algorithm::HS256,
    }
}

/// Mint a bearer token for `user_id`, valid for `access_token_expire_minutes`.
pub fn issue_token(config: &CoreConfig, user_id: UserId) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
    let exp = now + (config.access_token_expire_minutes as usize) * 60;
    let claims = Claims { sub: user_id, exp };
    let header = Header::new(algorithm(config));
    let key = EncodingKey::from_secret(config.secret_key.as_bytes());
    Ok(encode(&header, &claims, &key)?)
}

fn verify_token(config: &CoreConfig, token: &str) -> Option<UserId> {
    let validation = Validation::new(algorithm(config));
    let key = DecodingKey::from_secret(config.secret_key.as_bytes());
    decode::<Claims>(token, &key, &validation).ok().map(|data| data.claims.sub)
}

/// The authenticated caller, extracted from a valid `Authorization: Bearer`
/// header. Any missing/malformed/expired token is a 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    CoreConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = CoreConfig::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let token = header.strip_prefix("Bearer ").ok_or(StatusCode::UNAUTHORIZED)?;
        verify_token(&config, token).map(AuthUser).ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CoreConfig {
        CoreConfig {
            database_url: "postgres://test".to_string(),
            db_max_connections: 1,
            secret_key: "test-secret".to_string(),
            jwt_algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            ocr_confidence_threshold: 0.75,
            enable_google_vision: false,
            google_vision_credentials: None,
            enable_llm_fallback: false,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_max_tokens: 1024,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            enable_auto_approve: false,
            max_upload_size: 10 * 1024 * 1024,
            upload_dir: "/tmp/uploads".to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_redirect_uri: String::new(),
            frontend_url: "http://localhost:3000".to_string(),
            cors_origins: "*".to_string(),
        }
    }

    #[test]
    fn issued_token_round_trips_to_the_same_user() {
        let config = test_config();
        let user_id = UserId::new();
        let token = issue_token(&config, user_id).unwrap();
        assert_eq!(verify_token(&config, &token), Some(user_id));
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let config = test_config();
        let token = issue_token(&config, UserId::new()).unwrap();
        let mut other = test_config();
        other.secret_key = "different-secret".to_string();
        assert_eq!(verify_token(&other, &token), None);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = test_config();
        assert_eq!(verify_token(&config, "not-a-jwt"), None);
    }
}

//! Process-wide configuration loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Shared core configuration: database connectivity and the feature flags
/// / thresholds that gate pipeline behavior.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub secret_key: String,

    // Bearer token auth
    pub jwt_algorithm: String,
    pub access_token_expire_minutes: i64,

    // Extraction / OCR
    pub ocr_confidence_threshold: f32,
    pub enable_google_vision: bool,
    pub google_vision_credentials: Option<String>,
    pub enable_llm_fallback: bool,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_base_url: String,

    // Auto-approval
    pub enable_auto_approve: bool,

    // Uploads
    pub max_upload_size: u64,
    pub upload_dir: String,

    // Calendar OAuth
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,

    pub frontend_url: String,
    pub cors_origins: String,
}

impl CoreConfig {
    /// Load configuration from environment variables. Also loads a `.env`
    /// file if present and not already loaded.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("failed to parse DATABASE_MAX_CONNECTIONS as u32")?,
            secret_key: env::var("SECRET_KEY").context("SECRET_KEY must be set")?,

            jwt_algorithm: env::var("ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            access_token_expire_minutes: env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("failed to parse ACCESS_TOKEN_EXPIRE_MINUTES as i64")?,

            ocr_confidence_threshold: env::var("OCR_CONFIDENCE_THRESHOLD")
                .unwrap_or_else(|_| "0.75".to_string())
                .parse()
                .context("failed to parse OCR_CONFIDENCE_THRESHOLD as f32")?,
            enable_google_vision: env_flag("ENABLE_GOOGLE_VISION", false),
            google_vision_credentials: env::var("GOOGLE_VISION_CREDENTIALS").ok(),
            enable_llm_fallback: env_flag("ENABLE_LLM_FALLBACK", false),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_max_tokens: env::var("OPENAI_MAX_TOKENS")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .context("failed to parse OPENAI_MAX_TOKENS as u32")?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),

            enable_auto_approve: env_flag("ENABLE_AUTO_APPROVE", true),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| "10485760".to_string())
                .parse()
                .context("failed to parse MAX_UPLOAD_SIZE as u64")?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),

            google_client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI").unwrap_or_default(),

            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in ["DATABASE_URL", "SECRET_KEY", "OCR_CONFIDENCE_THRESHOLD", "MAX_UPLOAD_SIZE"] {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn from_env_applies_documented_defaults() {
        clear_env();
        unsafe {
            env::set_var("DATABASE_URL", "postgres://test");
            env::set_var("SECRET_KEY", "test-secret");
        }

        let config = CoreConfig::from_env().unwrap();
        assert!((config.ocr_confidence_threshold - 0.75).abs() < 1e-6);
        assert_eq!(config.max_upload_size, 10_485_760);
        assert!(config.enable_auto_approve);
        assert!(!config.enable_llm_fallback);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.jwt_algorithm, "HS256");
        assert_eq!(config.access_token_expire_minutes, 30);
    }

    #[test]
    #[serial]
    fn from_env_requires_database_url() {
        clear_env();
        unsafe { env::set_var("SECRET_KEY", "test-secret") };
        assert!(CoreConfig::from_env().is_err());
    }
}

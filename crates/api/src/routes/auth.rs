//! Google OAuth2 login (§2 Gmail/Calendar grant, §6 auth).
//!
//! The teacher authenticated Mini App users against Telegram's `initData`
//! HMAC; there is no Telegram surface here, so the equivalent trust
//! boundary is "the caller completed Google's OAuth consent screen". A
//! successful callback mints the bearer JWT every other route requires.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use eventline_core::config::CoreConfig;
use eventline_core::error::CoreError;
use eventline_core::models::CalendarProvider;
use eventline_core::security::TokenSealer;
use eventline_providers::GoogleCalendarAdapter;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use crate::error::ApiError;

const AUTH_SCOPES: &str = "openid email profile https://www.googleapis.com/auth/calendar";

/// Redirect the caller into Google's OAuth consent flow.
async fn login(State(config): State<CoreConfig>) -> Result<Response, ApiError> {
    if config.google_client_id.is_empty() || config.google_redirect_uri.is_empty() {
        return Err(CoreError::OauthMisconfigured(
            "GOOGLE_CLIENT_ID/GOOGLE_REDIRECT_URI are not configured".to_string(),
        )
        .into());
    }

    let url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&access_type=offline&prompt=consent&scope={}",
        urlencoding::encode(&config.google_client_id),
        urlencoding::encode(&config.google_redirect_uri),
        urlencoding::encode(AUTH_SCOPES),
    );
    Ok(Redirect::to(&url).into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
}

/// Exchange the authorization code for tokens, upsert the user, seal and
/// store the Google tokens, and mint a bearer JWT for the frontend.
async fn callback(
    State(pool): State<PgPool>,
    State(config): State<CoreConfig>,
    Query(query): Query<CallbackQuery>,
) -> Result<axum::Json<LoginResponse>, ApiError> {
    if config.google_client_id.is_empty() || config.google_client_secret.is_empty() {
        return Err(CoreError::OauthMisconfigured(
            "GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET are not configured".to_string(),
        )
        .into());
    }

    let http = reqwest::Client::new();
    let token_response = http
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("code", query.code.as_str()),
            ("client_id", config.google_client_id.as_str()),
            ("client_secret", config.google_client_secret.as_str()),
            ("redirect_uri", config.google_redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| CoreError::UpstreamUnavailable(format!("google token exchange failed: {e}")))?;

    if !token_response.status().is_success() {
        return Err(CoreError::UpstreamRejected(format!(
            "google rejected the authorization code: {}",
            token_response.status()
        ))
        .into());
    }

    let tokens: TokenResponse = token_response
        .json()
        .await
        .map_err(|e| CoreError::UpstreamUnavailable(format!("malformed token response: {e}")))?;

    let user_info: UserInfo = http
        .get("https://www.googleapis.com/oauth2/v3/userinfo")
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| CoreError::UpstreamUnavailable(format!("google userinfo failed: {e}")))?
        .json()
        .await
        .map_err(|e| CoreError::UpstreamUnavailable(format!("malformed userinfo response: {e}")))?;

    let user = match eventline_shared::repo::get_user_by_email(&pool, &user_info.email).await? {
        Some(user) => user,
        None => {
            eventline_shared::repo::create_user(
                &pool,
                &user_info.email,
                user_info.name.as_deref().unwrap_or(&user_info.email),
                "UTC",
            )
            .await?
        }
    };

    let sealer = TokenSealer::new(&config.secret_key);
    let sealed_access = sealer
        .seal(&tokens.access_token)
        .map_err(|e| CoreError::Internal(format!("failed to seal access token: {e}")))?;
    let sealed_refresh = match &tokens.refresh_token {
        Some(token) => Some(
            sealer
                .seal(token)
                .map_err(|e| CoreError::Internal(format!("failed to seal refresh token: {e}")))?,
        ),
        None => None,
    };

    eventline_shared::repo::set_google_tokens(
        &pool,
        user.id,
        &sealed_access,
        sealed_refresh.as_deref(),
        Utc::now() + Duration::seconds(tokens.expires_in),
    )
    .await?;

    // Populate the user's calendar list so a later sync_event job has a
    // default target to resolve against (C8 list_calendars()); skipping a
    // calendar already seen on a previous login keeps re-auth idempotent.
    let calendar_adapter = GoogleCalendarAdapter::new(http, tokens.access_token.clone());
    match calendar_adapter.list_calendars().await {
        Ok(provider_calendars) => {
            for pc in provider_calendars {
                let existing = eventline_shared::repo::get_calendar_by_external_id(
                    &pool,
                    user.id,
                    CalendarProvider::Google,
                    &pc.id,
                )
                .await?;
                if existing.is_none() {
                    eventline_shared::repo::create_calendar(
                        &pool,
                        user.id,
                        CalendarProvider::Google,
                        pc.id,
                        pc.summary,
                        pc.background_color,
                        pc.primary,
                    )
                    .await?;
                }
            }
        }
        Err(e) => {
            warn!("failed to list google calendars for user {}: {e}", user.id);
        }
    }

    let jwt = crate::auth::issue_token(&config, user.id)
        .map_err(|e| CoreError::Internal(format!("failed to issue bearer token: {e}")))?;

    Ok(axum::Json(LoginResponse { access_token: jwt }))
}

pub fn routes() -> axum::Router<crate::AppState> {
    axum::Router::new()
        .route("/auth/google/login", axum::routing::get(login))
        .route("/auth/google/callback", axum::routing::get(callback))
}

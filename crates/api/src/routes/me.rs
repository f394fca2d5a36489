//! Current-user profile endpoint.

use axum::{Json, extract::State};
use eventline_core::error::CoreError;
use eventline_core::models::User;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::error::ApiError;

async fn get_me(State(pool): State<PgPool>, AuthUser(user_id): AuthUser) -> Result<Json<User>, ApiError> {
    let user = eventline_shared::repo::get_user(&pool, user_id)
        .await?
        .ok_or(CoreError::UserNotFound(user_id))?;
    Ok(Json(user))
}

pub fn routes() -> axum::Router<crate::AppState> {
    axum::Router::new().route("/me", axum::routing::get(get_me))
}

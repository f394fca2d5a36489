//! Calendar listing and default-calendar selection (§3 calendars, §4.5).

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use eventline_core::error::CoreError;
use eventline_core::models::Calendar;
use eventline_core::types::CalendarId;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::error::ApiError;

/// List the caller's synced calendars.
async fn list_calendars(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Calendar>>, ApiError> {
    let calendars = eventline_shared::repo::list_calendars_for_user(&pool, user_id).await?;
    Ok(Json(calendars))
}

/// Mark one of the caller's calendars as the default sync target.
///
/// Cross-user access (an id that exists but belongs to someone else)
/// reads as not-found rather than forbidden.
async fn set_default(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(calendar_id): Path<CalendarId>,
) -> Result<Json<Calendar>, ApiError> {
    let calendar = eventline_shared::repo::get_calendar(&pool, calendar_id)
        .await?
        .filter(|c| c.user_id == user_id)
        .ok_or(CoreError::CalendarNotFound(calendar_id))?;

    eventline_shared::repo::set_default_calendar(&pool, user_id, calendar_id).await?;

    Ok(Json(Calendar { is_default: true, ..calendar }))
}

pub fn routes() -> Router<crate::AppState> {
    Router::new()
        .route("/calendars", get(list_calendars))
        .route("/calendars/{id}/set-default", post(set_default))
}

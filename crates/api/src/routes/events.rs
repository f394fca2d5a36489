//! Event review endpoints (§4.6, §6): list/inspect drafts, approve, reject,
//! patch, delete. All cross-user access resolves as not-found.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use eventline_core::error::CoreError;
use eventline_core::models::{Event, EventStatus};
use eventline_core::types::{CalendarId, EventId};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub status: Option<EventStatus>,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

async fn list_events(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let events =
        eventline_shared::repo::list_events_for_user(&pool, user_id, query.status, query.skip, limit).await?;
    Ok(Json(events))
}

async fn get_event(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<EventId>,
) -> Result<Json<Event>, ApiError> {
    let event = eventline_shared::repo::get_event_for_user(&pool, event_id, user_id)
        .await?
        .ok_or(CoreError::EventNotFound(event_id))?;
    Ok(Json(event))
}

/// User-authoritative modification patch (§4.6: fields the caller supplies
/// win outright over the extracted draft, no confidence weighing).
#[derive(Debug, Deserialize, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Distinguishes "field omitted" (`None`) from "field explicitly set to
/// null" (`Some(None)`) in a JSON body, matching
/// `eventline_shared::repo::apply_event_patch`'s COALESCE-vs-CASE update
/// contract.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

async fn patch_event(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<EventId>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<Event>, ApiError> {
    eventline_shared::repo::get_event_for_user(&pool, event_id, user_id)
        .await?
        .ok_or(CoreError::EventNotFound(event_id))?;

    let event = eventline_shared::repo::apply_event_patch(
        &pool,
        event_id,
        patch.title,
        patch.start,
        patch.end,
        patch.location,
        patch.notes,
    )
    .await?;
    Ok(Json(event))
}

async fn delete_event(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<EventId>,
) -> Result<StatusCode, ApiError> {
    let event = eventline_shared::repo::get_event_for_user(&pool, event_id, user_id)
        .await?
        .ok_or(CoreError::EventNotFound(event_id))?;

    // A synced event has a live external copy; deleting it locally must
    // also queue its removal from the calendar it was pushed to.
    if event.status == EventStatus::Synced {
        eventline_shared::jobs::enqueue_delete_event_sync(&pool, event_id).await?;
    }
    eventline_shared::repo::delete_event(&pool, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Default)]
pub struct ApproveRequest {
    #[serde(default)]
    pub modifications: EventPatch,
    pub calendar_id: Option<CalendarId>,
}

async fn approve_event(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<EventId>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = eventline_shared::repo::get_event_for_user(&pool, event_id, user_id)
        .await?
        .ok_or(CoreError::EventNotFound(event_id))?;

    if event.status != EventStatus::PendingApproval {
        return Err(CoreError::InputInvalid(format!(
            "event {event_id} is not pending approval"
        ))
        .into());
    }

    let patch = request.modifications;
    if patch.title.is_some()
        || patch.start.is_some()
        || patch.end.is_some()
        || patch.location.is_some()
        || patch.notes.is_some()
    {
        eventline_shared::repo::apply_event_patch(
            &pool,
            event_id,
            patch.title,
            patch.start,
            patch.end,
            patch.location,
            patch.notes,
        )
        .await?;
    }

    let event = eventline_shared::repo::approve_event(&pool, event_id, request.calendar_id).await?;
    eventline_shared::jobs::enqueue_sync_event(&pool, event_id, request.calendar_id).await?;

    Ok(Json(event))
}

async fn reject_event(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<EventId>,
) -> Result<Json<Event>, ApiError> {
    eventline_shared::repo::get_event_for_user(&pool, event_id, user_id)
        .await?
        .ok_or(CoreError::EventNotFound(event_id))?;

    let event = eventline_shared::repo::reject_event(&pool, event_id).await?;
    Ok(Json(event))
}

pub fn routes() -> Router<crate::AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event).patch(patch_event).delete(delete_event))
        .route("/events/{id}/approve", post(approve_event))
        .route("/events/{id}/reject", post(reject_event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_omitted_field_stays_none() {
        let patch: EventPatch = serde_json::from_str(r#"{"title":"New title"}"#).unwrap();
        assert_eq!(patch.title.as_deref(), Some("New title"));
        assert_eq!(patch.end, None);
        assert_eq!(patch.location, None);
    }

    #[test]
    fn patch_explicit_null_clears_field() {
        let patch: EventPatch = serde_json::from_str(r#"{"location":null}"#).unwrap();
        assert_eq!(patch.location, Some(None));
        assert_eq!(patch.notes, None);
    }

    #[test]
    fn patch_present_value_sets_field() {
        let patch: EventPatch = serde_json::from_str(r#"{"notes":"call first"}"#).unwrap();
        assert_eq!(patch.notes, Some(Some("call first".to_string())));
    }

    #[test]
    fn list_query_defaults_skip_to_zero() {
        let query: ListEventsQuery = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(query.skip, 0);
        assert!(query.status.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn approve_request_defaults_to_empty_patch() {
        let request: ApproveRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(request.calendar_id.is_none());
        assert!(request.modifications.title.is_none());
    }
}

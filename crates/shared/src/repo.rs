//! Repository functions shared between the API (producer/reader) and the
//! worker (consumer/writer) for the four entities in §3: users, messages,
//! events, calendars. Runtime-checked queries (`query_as`, not the `query!`
//! macro) since this repository ships without a compiled-in schema.

use chrono::{DateTime, Utc};
use eventline_core::models::{
    Attachment, Calendar, CalendarProvider, Event, EventStatus, EventType, ExtractionMethod, Message,
    MessageProvider, User,
};
use eventline_core::types::{CalendarId, EventId, MessageId, UserId};
use sqlx::{PgPool, Postgres, Transaction};

// ---------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------

pub async fn get_user(pool: &PgPool, user_id: UserId) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Create a user on first Google sign-in. `trusted_sender_domains` starts
/// empty; the user populates it later from settings.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    display_name: &str,
    default_timezone: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (
            id, display_name, preferred_name, external_identity_key, email,
            default_timezone, auto_approve_enabled, trusted_sender_domains,
            google_access_token, google_refresh_token, google_token_expires_at, created_at
        )
        VALUES ($1, $2, NULL, NULL, $3, $4, false, $5, NULL, NULL, NULL, NOW())
        RETURNING *
        "#,
    )
    .bind(UserId::new())
    .bind(display_name)
    .bind(email)
    .bind(default_timezone)
    .bind(sqlx::types::Json(Vec::<String>::new()))
    .fetch_one(pool)
    .await
}

/// Persist the sealed OAuth tokens from a Google sign-in/refresh.
pub async fn set_google_tokens(
    pool: &PgPool,
    user_id: UserId,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET google_access_token = $2,
            google_refresh_token = COALESCE($3, google_refresh_token),
            google_token_expires_at = $4
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub async fn create_message(
    pool: &PgPool,
    user_id: UserId,
    provider: MessageProvider,
    external_id: Option<String>,
    subject: Option<String>,
    sender_email: Option<String>,
    sender_name: Option<String>,
    body_text: Option<String>,
    body_html: Option<String>,
    attachments: Vec<Attachment>,
) -> Result<Message, sqlx::Error> {
    sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (
            id, user_id, provider, external_id, subject, sender_email, sender_name,
            received_at, body_text, body_html, attachments, processed, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), $8, $9, $10, false, NOW())
        RETURNING *
        "#,
    )
    .bind(MessageId::new())
    .bind(user_id)
    .bind(provider)
    .bind(external_id)
    .bind(subject)
    .bind(sender_email)
    .bind(sender_name)
    .bind(body_text)
    .bind(body_html)
    .bind(sqlx::types::Json(attachments))
    .fetch_one(pool)
    .await
}

pub async fn get_message(pool: &PgPool, message_id: MessageId) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(message_id)
        .fetch_optional(pool)
        .await
}

#[allow(clippy::too_many_arguments)]
pub async fn overwrite_scraped_message(
    pool: &PgPool,
    message_id: MessageId,
    subject: &str,
    body_text: &str,
    body_html: &str,
    links: Vec<String>,
) -> Result<(), sqlx::Error> {
    let link_attachment = Attachment::LinkSet { links };
    sqlx::query(
        r#"
        UPDATE messages
        SET subject = $2, body_text = $3, body_html = $4,
            attachments = attachments || $5::jsonb
        WHERE id = $1
        "#,
    )
    .bind(message_id)
    .bind(subject)
    .bind(body_text)
    .bind(body_html)
    .bind(sqlx::types::Json(vec![link_attachment]))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_attachment_ocr(
    pool: &PgPool,
    message_id: MessageId,
    attachments: Vec<Attachment>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET attachments = $2 WHERE id = $1")
        .bind(message_id)
        .bind(sqlx::types::Json(attachments))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_message_processed(
    pool: &PgPool,
    message_id: MessageId,
    processing_error: Option<String>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE messages SET processed = true, processed_at = NOW(), processing_error = $2 WHERE id = $1",
    )
    .bind(message_id)
    .bind(processing_error)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_message_ocr_confidence(
    pool: &PgPool,
    message_id: MessageId,
    ocr_confidence: i16,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET ocr_confidence = $2 WHERE id = $1")
        .bind(message_id)
        .bind(ocr_confidence)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub struct NewEvent {
    pub user_id: UserId,
    pub source_message_id: Option<MessageId>,
    pub event_type: EventType,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub allday: bool,
    pub timezone: String,
    pub location: Option<String>,
    pub online_url: Option<String>,
    pub notes: Option<String>,
    pub attendees: sqlx::types::Json<Vec<eventline_core::models::EventAttendee>>,
    pub reminders: sqlx::types::Json<Vec<eventline_core::models::Reminder>>,
    pub recurrence: Option<String>,
    pub labels: sqlx::types::Json<Vec<String>>,
    pub confidence: f32,
    pub extraction_method: ExtractionMethod,
    pub provider: Option<MessageProvider>,
    pub status: EventStatus,
    pub approved_at: Option<DateTime<Utc>>,
}

pub async fn create_event(pool: &PgPool, e: NewEvent) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (
            id, user_id, source_message_id, event_type, title, start, "end", allday, timezone,
            location, online_url, notes, attendees, reminders, recurrence, labels,
            confidence, extraction_method, provider, status, approved_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(EventId::new())
    .bind(e.user_id)
    .bind(e.source_message_id)
    .bind(e.event_type)
    .bind(e.title)
    .bind(e.start)
    .bind(e.end)
    .bind(e.allday)
    .bind(e.timezone)
    .bind(e.location)
    .bind(e.online_url)
    .bind(e.notes)
    .bind(e.attendees)
    .bind(e.reminders)
    .bind(e.recurrence)
    .bind(e.labels)
    .bind(e.confidence)
    .bind(e.extraction_method)
    .bind(e.provider)
    .bind(e.status)
    .bind(e.approved_at)
    .fetch_one(pool)
    .await
}

pub async fn get_event(pool: &PgPool, event_id: EventId) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_event_for_user(
    pool: &PgPool,
    event_id: EventId,
    user_id: UserId,
) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 AND user_id = $2")
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_events_for_user(
    pool: &PgPool,
    user_id: UserId,
    status: Option<EventStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        SELECT * FROM events
        WHERE user_id = $1 AND ($2::event_status IS NULL OR status = $2)
        ORDER BY start DESC
        OFFSET $3 LIMIT $4
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn approve_event(
    pool: &PgPool,
    event_id: EventId,
    target_calendar_id: Option<CalendarId>,
) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET status = 'APPROVED', approved_at = NOW(), target_calendar_id = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(target_calendar_id)
    .fetch_one(pool)
    .await
}

/// Apply a user-authoritative modification patch, only overwriting fields
/// the caller actually supplied (`None` means "leave as-is").
#[allow(clippy::too_many_arguments)]
pub async fn apply_event_patch(
    pool: &PgPool,
    event_id: EventId,
    title: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<Option<DateTime<Utc>>>,
    location: Option<Option<String>>,
    notes: Option<Option<String>>,
) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET title = COALESCE($2, title),
            start = COALESCE($3, start),
            "end" = CASE WHEN $4 THEN $5 ELSE "end" END,
            location = CASE WHEN $6 THEN $7 ELSE location END,
            notes = CASE WHEN $8 THEN $9 ELSE notes END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(title)
    .bind(start)
    .bind(end.is_some())
    .bind(end.flatten())
    .bind(location.is_some())
    .bind(location.flatten())
    .bind(notes.is_some())
    .bind(notes.flatten())
    .fetch_one(pool)
    .await
}

pub async fn reject_event(pool: &PgPool, event_id: EventId) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET status = 'REJECTED', rejected_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(event_id)
    .fetch_one(pool)
    .await
}

pub async fn mark_event_synced(
    pool: &PgPool,
    event_id: EventId,
    external_event_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE events
        SET status = 'SYNCED', external_event_id = $2, synced_at = NOW(), last_error = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .bind(external_event_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_event_error(pool: &PgPool, event_id: EventId, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE events SET status = 'ERROR', last_error = $2, updated_at = NOW() WHERE id = $1")
        .bind(event_id)
        .bind(error)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_event(pool: &PgPool, event_id: EventId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Janitorial sweep: remove rejected events older than `days`.
pub async fn delete_rejected_older_than(pool: &PgPool, days: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM events WHERE status = 'REJECTED' AND rejected_at < NOW() - make_interval(days => $1)",
    )
    .bind(days as i32)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------
// Calendars
// ---------------------------------------------------------------------

pub async fn list_calendars_for_user(pool: &PgPool, user_id: UserId) -> Result<Vec<Calendar>, sqlx::Error> {
    sqlx::query_as::<_, Calendar>("SELECT * FROM calendars WHERE user_id = $1 ORDER BY created_at")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn get_calendar(pool: &PgPool, calendar_id: CalendarId) -> Result<Option<Calendar>, sqlx::Error> {
    sqlx::query_as::<_, Calendar>("SELECT * FROM calendars WHERE id = $1")
        .bind(calendar_id)
        .fetch_optional(pool)
        .await
}

/// Used by the OAuth callback to avoid re-inserting a calendar the
/// provider already reported on a previous login.
pub async fn get_calendar_by_external_id(
    pool: &PgPool,
    user_id: UserId,
    provider: CalendarProvider,
    external_calendar_id: &str,
) -> Result<Option<Calendar>, sqlx::Error> {
    sqlx::query_as::<_, Calendar>(
        "SELECT * FROM calendars WHERE user_id = $1 AND provider = $2 AND external_calendar_id = $3",
    )
    .bind(user_id)
    .bind(provider)
    .bind(external_calendar_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_default_active_calendar(
    pool: &PgPool,
    user_id: UserId,
) -> Result<Option<Calendar>, sqlx::Error> {
    sqlx::query_as::<_, Calendar>(
        "SELECT * FROM calendars WHERE user_id = $1 AND is_default = true AND is_active = true",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Enforce "at most one default per user" (P4) by clearing any existing
/// default within the same transaction that sets the new one.
pub async fn set_default_calendar(pool: &PgPool, user_id: UserId, calendar_id: CalendarId) -> Result<(), sqlx::Error> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;
    sqlx::query("UPDATE calendars SET is_default = false WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE calendars SET is_default = true WHERE id = $1 AND user_id = $2")
        .bind(calendar_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}

pub async fn create_calendar(
    pool: &PgPool,
    user_id: UserId,
    provider: CalendarProvider,
    external_calendar_id: String,
    display_name: String,
    color: Option<String>,
    is_default: bool,
) -> Result<Calendar, sqlx::Error> {
    sqlx::query_as::<_, Calendar>(
        r#"
        INSERT INTO calendars (id, user_id, provider, external_calendar_id, display_name, color, is_default, is_active, sync_enabled, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, true, true, NOW())
        RETURNING *
        "#,
    )
    .bind(CalendarId::new())
    .bind(user_id)
    .bind(provider)
    .bind(external_calendar_id)
    .bind(display_name)
    .bind(color)
    .bind(is_default)
    .fetch_one(pool)
    .await
}

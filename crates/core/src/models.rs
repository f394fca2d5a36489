//! Domain entities for the ingestion-to-event pipeline.
//!
//! These types map directly to database tables (see `migrations/`) and to
//! the canonical event JSON wire shape shared between extractors, the
//! merger, storage, and calendar sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CalendarId, EventId, MessageId, UserId};

/// A user of the system.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// Used by locale extractors to disambiguate table rows (e.g. matching
    /// a name against a Hungarian exam schedule).
    pub preferred_name: Option<String>,
    /// External identity key, e.g. a Hungarian Neptun ID.
    pub external_identity_key: Option<String>,
    pub email: String,
    /// IANA timezone, e.g. "Europe/Budapest".
    pub default_timezone: String,
    pub auto_approve_enabled: bool,
    /// Sender domains/addresses that raise the auto-approval confidence
    /// floor when matched against a message's `sender_email`.
    pub trusted_sender_domains: sqlx::types::Json<Vec<String>>,
    /// Opaque, sealed OAuth access/refresh tokens (see `security::seal`).
    pub google_access_token: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Provider a message arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_provider", rename_all = "lowercase")]
pub enum MessageProvider {
    Gmail,
    Upload,
    Website,
}

/// One attachment on a message, tagged by kind rather than a schemaless map
/// (per the design notes: tagged-variant list, not free-form JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Attachment {
    File {
        filename: String,
        mime_type: String,
        size: u64,
        /// On-disk path under `UPLOAD_DIR`.
        path: String,
        ocr_text: Option<String>,
        /// 0.0-1.0 confidence from the OCR router.
        ocr_confidence: Option<f32>,
    },
    LinkSet {
        links: Vec<String>,
    },
}

/// The raw artifact that enters the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub provider: MessageProvider,
    /// Dedup key for providers that supply one (e.g. Gmail message id).
    pub external_id: Option<String>,
    /// Provider thread/conversation identifier, carried through but not
    /// acted on by any core logic.
    pub thread_id: Option<String>,
    pub subject: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub received_at: DateTime<Utc>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub attachments: sqlx::types::Json<Vec<Attachment>>,
    /// Summary confidence (0-100), the minimum across attachment OCR
    /// confidences, distinct from the per-attachment float values.
    pub ocr_confidence: Option<i16>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub processing_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `event` or `task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "lowercase")]
pub enum EventType {
    Event,
    Task,
}

/// Provenance of an extracted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "extraction_method", rename_all = "lowercase")]
pub enum ExtractionMethod {
    Deterministic,
    Llm,
    Hybrid,
}

/// Event lifecycle status (see §4.7's state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "UPPERCASE")]
pub enum EventStatus {
    PendingApproval,
    Approved,
    Rejected,
    Synced,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttendee {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Popup,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes: u32,
}

/// A canonical event, draft or synced.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: EventId,
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
    pub attendees: sqlx::types::Json<Vec<EventAttendee>>,
    pub reminders: sqlx::types::Json<Vec<Reminder>>,
    /// RFC 5545 RRULE string.
    pub recurrence: Option<String>,
    pub labels: sqlx::types::Json<Vec<String>>,
    pub confidence: f32,
    pub extraction_method: ExtractionMethod,
    /// Denormalized copy of the source message's provider, so listing by
    /// provider doesn't require a join.
    pub provider: Option<MessageProvider>,
    pub status: EventStatus,
    pub target_calendar_id: Option<CalendarId>,
    pub external_event_id: Option<String>,
    /// Most recent sync failure message; cleared on the next successful
    /// sync, retained across retries until then.
    pub last_error: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "calendar_provider", rename_all = "lowercase")]
pub enum CalendarProvider {
    Google,
}

/// A calendar a user can sync approved events to.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Calendar {
    pub id: CalendarId,
    pub user_id: UserId,
    pub provider: CalendarProvider,
    pub external_calendar_id: String,
    pub display_name: String,
    pub color: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub sync_enabled: bool,
    pub created_at: DateTime<Utc>,
}

//! The pre-validation event shape produced by extractors and consumed by
//! the merger (C2-C4). A [`Draft`] becomes a [`crate::models::Event`] only
//! after validation fills its defaults and the confidence scorer runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EventAttendee, EventType, Reminder};

/// Which extractor produced a draft. Used both to pick the merge base
/// (deterministic precedes llm) and to tag the resulting event's
/// `extraction_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionSource {
    Deterministic,
    Llm,
}

/// A candidate event before validation and confidence scoring.
///
/// Every field is optional or has an empty default; the merger/validator
/// (C4) is the only place defaults get filled, exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Draft {
    pub event_type: Option<EventType>,
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub allday: bool,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub online_url: Option<String>,
    pub notes: Option<String>,
    pub attendees: Vec<EventAttendee>,
    pub reminders: Vec<Reminder>,
    pub recurrence: Option<String>,
    pub labels: Vec<String>,
}

/// Context carried alongside a draft through scoring and auto-approval,
/// mirroring the "context flags" referenced loosely in the distilled spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftContext {
    pub trusted_sender: bool,
    /// `None` or `1.0` means "no OCR was involved / full confidence".
    pub ocr_confidence: Option<f32>,
}

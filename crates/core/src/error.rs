//! Error taxonomy for the ingestion-to-event pipeline.

use crate::types::{CalendarId, EventId, MessageId, UserId};
use thiserror::Error;

/// Core domain error taxonomy.
///
/// Every variant maps to exactly one HTTP status at the API boundary
/// (see `eventline-api`'s `ApiError` conversion); domain code never
/// constructs an HTTP status directly.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("calendar not found: {0}")]
    CalendarNotFound(CalendarId),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("oauth misconfigured: {0}")]
    OauthMisconfigured(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream rejected: {0}")]
    UpstreamRejected(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("invalid recurrence rule: {0}")]
    InvalidRRule(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

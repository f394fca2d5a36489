//! Eventline core - pure domain logic for the ingestion-to-event pipeline.
//!
//! This crate contains domain models, the error taxonomy, confidence
//! scoring, timezone/recurrence helpers, and token sealing. No I/O beyond
//! what `sqlx::FromRow`/`sqlx::Type` derives require for the types to be
//! directly queryable.

pub mod confidence;
pub mod config;
pub mod draft;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod security;
pub mod timezone;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use recurrence::{expand_rrule, next_occurrences, validate_rrule};
pub use timezone::{default_timezone, parse_timezone, to_timezone, to_utc, validate_timezone};

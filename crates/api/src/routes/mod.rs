//! API route modules

pub mod auth;
pub mod calendars;
pub mod events;
pub mod health;
pub mod ingestion;
pub mod me;

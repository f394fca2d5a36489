//! Provider adapters (C8): mail fetch, calendar CRUD, web scrape.
//!
//! Each adapter family exposes the minimal capability set the core
//! pipeline and sync engine need; translation between canonical and
//! provider shapes happens in the caller, not here.

pub mod calendar;
pub mod mail;
pub mod scraper;

pub use calendar::GoogleCalendarAdapter;
pub use mail::GmailAdapter;
pub use scraper::ScraperAdapter;

//! Calendar Sync Engine (C6): translates an approved canonical [`Event`]
//! into a provider event body and pushes it across the [`GoogleCalendarAdapter`].
//!
//! Grounded in the original's `sync_event_to_calendar` task: resolve the
//! target calendar, translate, call out, and commit the resulting status.
//! The undo path (`delete_event_sync`) mirrors it for deletion.

use chrono::{Duration, Utc};
use eventline_core::error::CoreError;
use eventline_core::models::{Calendar, Event, EventStatus};
use eventline_core::security::TokenSealer;
use eventline_core::types::{CalendarId, EventId};
use eventline_providers::calendar::GoogleCalendarAdapter;
use eventline_shared::repo;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;

/// Sync one approved event to its target calendar. Idempotent: a no-op if
/// the event is already `SYNCED`, and a no-op (with a log line) if it is
/// in any status other than `APPROVED`.
pub async fn sync_event(pool: &PgPool, config: &Config, event_id: EventId, calendar_id: Option<CalendarId>) -> anyhow::Result<()> {
    let Some(event) = repo::get_event(pool, event_id).await? else {
        warn!("sync_event: event {} not found, dropping job", event_id);
        return Ok(());
    };

    match event.status {
        EventStatus::Synced => {
            info!("sync_event: event {} already synced, skipping", event_id);
            return Ok(());
        }
        EventStatus::Approved => {}
        other => {
            info!("sync_event: event {} is {:?}, not APPROVED, skipping", event_id, other);
            return Ok(());
        }
    }

    let target_calendar_id = calendar_id.or(event.target_calendar_id);
    let calendar = match target_calendar_id {
        Some(id) => repo::get_calendar(pool, id).await?,
        None => repo::get_default_active_calendar(pool, event.user_id).await?,
    };
    let Some(calendar) = calendar else {
        warn!("sync_event: event {} has no resolvable target calendar", event_id);
        repo::mark_event_error(pool, event_id, "no active default calendar configured").await?;
        return Ok(());
    };

    let user = repo::get_user(pool, event.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("event {} has no owning user", event_id))?;
    let Some(sealed_access_token) = user.google_access_token else {
        repo::mark_event_error(pool, event_id, "user has no Google access token on file").await?;
        return Ok(());
    };
    let sealer = TokenSealer::new(&config.core.secret_key);
    let access_token = sealer.open(&sealed_access_token)?;

    let http = reqwest::Client::new();
    let adapter = GoogleCalendarAdapter::new(http, access_token);
    let body = translate_event(&event);

    match adapter.create(&calendar.external_calendar_id, &body).await {
        Ok(external_event_id) => {
            repo::mark_event_synced(pool, event_id, &external_event_id).await?;
            info!("sync_event: event {} synced as {}", event_id, external_event_id);
            Ok(())
        }
        Err(e) => {
            repo::mark_event_error(pool, event_id, &e.to_string()).await?;
            match e {
                CoreError::UpstreamRejected(_) => Ok(()),
                _ => Err(e.into()),
            }
        }
    }
}

/// Undo an event: best-effort delete the external calendar entry, then
/// unconditionally delete the local row.
pub async fn delete_event_sync(pool: &PgPool, config: &Config, event_id: EventId) -> anyhow::Result<()> {
    let Some(event) = repo::get_event(pool, event_id).await? else {
        return Ok(());
    };

    if let Some(external_event_id) = event.external_event_id.as_deref() {
        if let Some(calendar) = resolve_calendar(pool, &event).await? {
            if let Some(user) = repo::get_user(pool, event.user_id).await? {
                if let Some(sealed) = user.google_access_token {
                    let sealer = TokenSealer::new(&config.core.secret_key);
                    match sealer.open(&sealed) {
                        Ok(access_token) => {
                            let adapter = GoogleCalendarAdapter::new(reqwest::Client::new(), access_token);
                            if let Err(e) = adapter.delete(&calendar.external_calendar_id, external_event_id).await {
                                warn!("delete_event_sync: external delete failed for {}: {}", event_id, e);
                            }
                        }
                        Err(e) => warn!("delete_event_sync: failed to unseal access token: {}", e),
                    }
                }
            }
        }
    }

    repo::delete_event(pool, event_id).await?;
    Ok(())
}

async fn resolve_calendar(pool: &PgPool, event: &Event) -> anyhow::Result<Option<Calendar>> {
    let calendar = match event.target_calendar_id {
        Some(id) => repo::get_calendar(pool, id).await?,
        None => repo::get_default_active_calendar(pool, event.user_id).await?,
    };
    Ok(calendar)
}

/// Canonical event -> Google Calendar `events.insert` request body.
fn translate_event(event: &Event) -> serde_json::Value {
    let mut description = event.notes.clone().unwrap_or_default();
    if let Some(url) = &event.online_url {
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str(&format!("Join: {url}"));
    }

    let end = event.end.unwrap_or_else(|| {
        if event.allday {
            event.start
        } else {
            event.start + Duration::hours(1)
        }
    });

    let (start_field, end_field) = if event.allday {
        (
            serde_json::json!({ "date": event.start.format("%Y-%m-%d").to_string() }),
            serde_json::json!({ "date": end.format("%Y-%m-%d").to_string() }),
        )
    } else {
        (
            serde_json::json!({ "dateTime": event.start.to_rfc3339(), "timeZone": event.timezone }),
            serde_json::json!({ "dateTime": end.to_rfc3339(), "timeZone": event.timezone }),
        )
    };

    let reminders = event
        .reminders
        .0
        .iter()
        .map(|r| {
            let method = match r.method {
                eventline_core::models::ReminderMethod::Popup => "popup",
                eventline_core::models::ReminderMethod::Email => "email",
            };
            serde_json::json!({ "method": method, "minutes": r.minutes })
        })
        .collect::<Vec<_>>();

    let attendees = event
        .attendees
        .0
        .iter()
        .map(|a| serde_json::json!({ "email": a.email, "displayName": a.name }))
        .collect::<Vec<_>>();

    let mut body = serde_json::json!({
        "summary": event.title,
        "description": description,
        "location": event.location,
        "start": start_field,
        "end": end_field,
        "reminders": { "useDefault": false, "overrides": reminders },
        "attendees": attendees,
    });

    if let Some(recurrence) = &event.recurrence {
        body["recurrence"] = serde_json::json!([recurrence]);
    }

    if let Some(color) = color_hint(&event.labels.0) {
        body["colorId"] = serde_json::json!(color);
    }

    body
}

/// Google Calendar `colorId` values: 11=tomato (red), 9=blueberry (blue),
/// 6=tangerine (orange). Fixed priority independent of array order --
/// `labels` is built from a `HashSet` union in the merger and so carries
/// no meaningful ordering of its own.
fn color_hint(labels: &[String]) -> Option<&'static str> {
    if labels.iter().any(|l| l == "exam") {
        Some("11")
    } else if labels.iter().any(|l| l == "meeting") {
        Some("9")
    } else if labels.iter().any(|l| l == "deadline") {
        Some("6")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventline_core::models::{EventAttendee, EventType, ExtractionMethod, MessageProvider, Reminder, ReminderMethod};
    use eventline_core::types::{MessageId, UserId};

    fn sample_event() -> Event {
        Event {
            id: EventId::new(),
            user_id: UserId::new(),
            source_message_id: Some(MessageId::new()),
            event_type: EventType::Event,
            title: "Team sync".to_string(),
            start: Utc::now(),
            end: None,
            allday: false,
            timezone: "Europe/Budapest".to_string(),
            location: Some("Room 3".to_string()),
            online_url: Some("https://meet.example/abc".to_string()),
            notes: Some("Bring laptop".to_string()),
            attendees: sqlx::types::Json(vec![EventAttendee {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            }]),
            reminders: sqlx::types::Json(vec![Reminder {
                method: ReminderMethod::Popup,
                minutes: 10,
            }]),
            recurrence: None,
            labels: sqlx::types::Json(vec!["meeting".to_string()]),
            confidence: 0.95,
            extraction_method: ExtractionMethod::Deterministic,
            provider: Some(MessageProvider::Gmail),
            status: EventStatus::Approved,
            target_calendar_id: None,
            external_event_id: None,
            last_error: None,
            approved_at: Some(Utc::now()),
            rejected_at: None,
            synced_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn translate_defaults_end_to_one_hour_after_start_for_timed_events() {
        let event = sample_event();
        let body = translate_event(&event);
        assert!(body["end"]["dateTime"].is_string());
        assert_eq!(body["start"]["timeZone"], "Europe/Budapest");
    }

    #[test]
    fn translate_appends_join_link_to_description() {
        let event = sample_event();
        let body = translate_event(&event);
        assert!(body["description"].as_str().unwrap().contains("Join: https://meet.example/abc"));
    }

    #[test]
    fn translate_uses_date_only_fields_for_allday_events() {
        let mut event = sample_event();
        event.allday = true;
        let body = translate_event(&event);
        assert!(body["start"]["date"].is_string());
        assert!(body["start"].get("dateTime").is_none());
    }

    #[test]
    fn color_hint_prefers_exam_over_meeting_regardless_of_array_order() {
        assert_eq!(color_hint(&["meeting".to_string(), "exam".to_string()]), Some("11"));
        assert_eq!(color_hint(&["exam".to_string(), "meeting".to_string()]), Some("11"));
    }

    #[test]
    fn color_hint_prefers_meeting_over_deadline() {
        assert_eq!(color_hint(&["deadline".to_string(), "meeting".to_string()]), Some("9"));
    }

    #[test]
    fn color_hint_falls_back_to_deadline_then_none() {
        assert_eq!(color_hint(&["deadline".to_string()]), Some("6"));
        assert_eq!(color_hint(&["unrelated".to_string()]), None);
        assert_eq!(color_hint(&[]), None);
    }
}

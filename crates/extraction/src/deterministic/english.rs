//! English/international pattern extraction: meetings, flights, deadlines.
//!
//! Grounded in the original's `extract_english_patterns` family. Date/time
//! strings captured by each pattern are handed to `chrono-english`'s loose
//! parser rather than a hand-rolled grammar, since the patterns themselves
//! only narrow down *where* a date/time sits in the text, not its format.

use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;
use eventline_core::draft::Draft;
use eventline_core::models::{EventType, Reminder, ReminderMethod};
use regex::Regex;
use std::sync::OnceLock;

fn meeting_patterns() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(
                r"(?i)meeting[:\s]+([^.]+?)(?:\s+on\s+|\s+)(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})(?:\s+at\s+|\s+)(\d{1,2}:\d{2}\s*(?:AM|PM)?)",
            )
            .unwrap(),
            Regex::new(
                r"(?i)(\w+.*?)\s+meeting\s+(?:on\s+)?(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})\s+(?:at\s+)?(\d{1,2}:\d{2}\s*(?:AM|PM)?)",
            )
            .unwrap(),
        ]
    })
}

fn flight_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:flight\s+)?([A-Z]{2}\s*\d{3,4}).*?(?:from\s+)?([A-Z]{3}).*?(?:to\s+)?([A-Z]{3}).*?(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})\s+(?:at\s+)?(\d{1,2}:\d{2}\s*(?:AM|PM)?)",
        )
        .unwrap()
    })
}

fn deadline_patterns() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?i)([^.]+?)\s+due\s+(?:on\s+)?(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap(),
            Regex::new(r"(?i)deadline[:\s]+([^.]+?)\s+(?:on\s+)?(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})")
                .unwrap(),
        ]
    })
}

fn parse_loose_datetime(text: &str, timezone: &str) -> Option<DateTime<Utc>> {
    let anchor = Local::now();
    let parsed = parse_date_string(text, anchor, Dialect::Us).ok()?;
    let tz: Tz = timezone.parse().unwrap_or(chrono_tz::UTC);
    let localized = parsed.with_timezone(&tz);
    Some(localized.with_timezone(&Utc))
}

pub fn extract(text: &str, default_timezone: &str) -> Vec<Draft> {
    let mut drafts = Vec::new();
    drafts.extend(extract_meetings(text, default_timezone));
    drafts.extend(extract_flights(text, default_timezone));
    drafts.extend(extract_deadlines(text, default_timezone));
    drafts
}

fn extract_meetings(text: &str, timezone: &str) -> Vec<Draft> {
    let mut drafts = Vec::new();
    for pattern in meeting_patterns() {
        for caps in pattern.captures_iter(text) {
            let title_raw = caps[1].trim().to_string();
            let date_str = &caps[2];
            let time_str = &caps[3];
            let Some(start) = parse_loose_datetime(&format!("{date_str} {time_str}"), timezone)
            else {
                continue;
            };
            let title = if title_raw.to_lowercase().contains("meeting") {
                title_raw
            } else {
                format!("{title_raw} meeting")
            };
            drafts.push(Draft {
                event_type: Some(EventType::Event),
                title,
                start: Some(start),
                end: Some(start + Duration::hours(1)),
                timezone: Some(timezone.to_string()),
                labels: vec!["meeting".to_string()],
                reminders: vec![Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 15,
                }],
                ..Default::default()
            });
        }
    }
    drafts
}

fn extract_flights(text: &str, timezone: &str) -> Vec<Draft> {
    let mut drafts = Vec::new();
    for caps in flight_pattern().captures_iter(text) {
        let flight_number = caps[1].trim().to_string();
        let origin = &caps[2];
        let destination = &caps[3];
        let date_str = &caps[4];
        let time_str = &caps[5];
        let Some(start) = parse_loose_datetime(&format!("{date_str} {time_str}"), timezone)
        else {
            continue;
        };
        drafts.push(Draft {
            event_type: Some(EventType::Event),
            title: format!("Flight {flight_number}: {origin} \u{2192} {destination}"),
            start: Some(start),
            end: Some(start + Duration::hours(3)),
            timezone: Some(timezone.to_string()),
            notes: Some(format!("Flight from {origin} to {destination}")),
            labels: vec!["flight".to_string(), "travel".to_string()],
            reminders: vec![
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 1440,
                },
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 180,
                },
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 60,
                },
            ],
            ..Default::default()
        });
    }
    drafts
}

fn extract_deadlines(text: &str, timezone: &str) -> Vec<Draft> {
    let mut drafts = Vec::new();
    for pattern in deadline_patterns() {
        for caps in pattern.captures_iter(text) {
            let task = caps[1].trim().to_string();
            let date_str = &caps[2];
            let Some(start) = parse_loose_datetime(&format!("{date_str} 23:59"), timezone) else {
                continue;
            };
            drafts.push(Draft {
                event_type: Some(EventType::Task),
                title: task,
                start: Some(start),
                allday: true,
                timezone: Some(timezone.to_string()),
                labels: vec!["deadline".to_string()],
                reminders: vec![
                    Reminder {
                        method: ReminderMethod::Popup,
                        minutes: 1440,
                    },
                    Reminder {
                        method: ReminderMethod::Popup,
                        minutes: 360,
                    },
                ],
                ..Default::default()
            });
        }
    }
    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_meeting_with_explicit_date_and_time() {
        let drafts = extract("Meeting: Budget review on 12/01/2026 at 3:00 PM", "UTC");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Budget review meeting");
        assert!(drafts[0].labels.contains(&"meeting".to_string()));
    }

    #[test]
    fn extracts_flight_with_airport_codes() {
        let drafts = extract(
            "Flight AA 123 from JFK to LAX on 12/01/2026 at 9:00 AM",
            "UTC",
        );
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].title.contains("JFK"));
        assert!(drafts[0].title.contains("LAX"));
        assert_eq!(drafts[0].reminders.len(), 3);
    }

    #[test]
    fn extracts_deadline_as_allday_task() {
        let drafts = extract("Final report due on 12/15/2026", "UTC");
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].allday);
        assert_eq!(drafts[0].event_type, Some(EventType::Task));
    }

    #[test]
    fn no_matches_yields_empty_vec() {
        assert!(extract("Just a regular sentence with no dates.", "UTC").is_empty());
    }
}

//! Hungarian exam-schedule extraction.
//!
//! Grounded in the original's `extract_hungarian_exam_schedule`: schedules
//! are plain-text tables with one date header line (`2025.11.04.`) followed
//! by rows of `Name — H óra M perc`, optionally filtered down to rows
//! matching a specific student's name or Neptun ID.

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use eventline_core::draft::Draft;
use eventline_core::models::{EventType, Reminder, ReminderMethod};
use regex::Regex;
use std::sync::OnceLock;

fn date_header_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<y>\d{4})\.(?P<m>\d{2})\.(?P<d>\d{2})\.").unwrap())
}

fn time_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<h>\d{1,2})\s*óra\s*(?P<m>\d{1,2})\s*perc").unwrap())
}

fn time_pattern_alt() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<h>\d{1,2}):(?P<m>\d{2})").unwrap())
}

fn room_patterns() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?i)terem\s*:?\s*([A-Z0-9\-.]+)").unwrap(),
            Regex::new(r"\b([A-Z]{1,2}[\-.]?\d{2,4})\b").unwrap(),
        ]
    })
}

/// Entry point for the Hungarian locale (currently only exam schedules).
pub fn extract(
    text: &str,
    default_timezone: &str,
    user_name: Option<&str>,
    external_identity_key: Option<&str>,
) -> Vec<Draft> {
    extract_exam_schedule(text, default_timezone, user_name, external_identity_key)
}

fn extract_room_from_line(line: &str) -> Option<String> {
    for pattern in room_patterns() {
        if let Some(m) = pattern.captures(line) {
            return m.get(1).map(|g| g.as_str().to_string());
        }
    }
    None
}

fn extract_exam_schedule(
    text: &str,
    default_timezone: &str,
    user_name: Option<&str>,
    external_identity_key: Option<&str>,
) -> Vec<Draft> {
    let mut drafts = Vec::new();

    let Some(date_caps) = date_header_pattern().captures(text) else {
        return drafts;
    };
    let year: i32 = date_caps["y"].parse().unwrap_or(1970);
    let month: u32 = date_caps["m"].parse().unwrap_or(1);
    let day: u32 = date_caps["d"].parse().unwrap_or(1);
    let Some(base_date) = NaiveDate::from_ymd_opt(year, month, day) else {
        return drafts;
    };

    let tz: Tz = default_timezone.parse().unwrap_or(chrono_tz::Europe::Budapest);

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let matches_user = match (user_name, external_identity_key) {
            (None, None) => true,
            (name, id) => {
                let name_hit = name
                    .map(|n| line.to_lowercase().contains(&n.to_lowercase()))
                    .unwrap_or(false);
                let id_hit = id
                    .map(|i| line.to_uppercase().contains(&i.to_uppercase()))
                    .unwrap_or(false);
                name_hit || id_hit
            }
        };
        if !matches_user {
            continue;
        }

        let time_caps = time_pattern()
            .captures(line)
            .or_else(|| time_pattern_alt().captures(line));
        let Some(time_caps) = time_caps else {
            continue;
        };
        let hour: u32 = time_caps["h"].parse().unwrap_or(0);
        let minute: u32 = time_caps["m"].parse().unwrap_or(0);

        let Some(naive_start) = base_date.and_hms_opt(hour, minute, 0) else {
            continue;
        };
        let Some(start) = tz.from_local_datetime(&naive_start).single() else {
            continue;
        };
        let start_utc = start.with_timezone(&chrono::Utc);
        let end_utc = start_utc + chrono::Duration::minutes(30);

        let location = extract_room_from_line(line);
        let name_part = line.split('—').next().map(str::trim).unwrap_or_default();

        drafts.push(Draft {
            event_type: Some(EventType::Event),
            title: "Exam appointment".to_string(),
            start: Some(start_utc),
            end: Some(end_utc),
            timezone: Some(default_timezone.to_string()),
            location,
            notes: Some(if name_part.is_empty() {
                "Imported from schedule. Matched user.".to_string()
            } else {
                format!("Imported from schedule. {name_part}")
            }),
            labels: vec!["exam".to_string()],
            reminders: vec![
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 1440,
                },
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 120,
                },
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 30,
                },
            ],
            ..Default::default()
        });
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_exam_row_matching_user_name() {
        let text = "2025.11.04.\nBalogh Csaba — 8 óra 50 perc Terem: A123\nKovács Anna — 9 óra 20 perc";
        let drafts = extract(text, "Europe/Budapest", Some("Balogh Csaba"), None);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Exam appointment");
        assert_eq!(drafts[0].location.as_deref(), Some("A123"));
        assert!(drafts[0].labels.contains(&"exam".to_string()));
        assert_eq!(drafts[0].reminders.len(), 3);
    }

    #[test]
    fn with_no_user_filter_extracts_every_row() {
        let text = "2025.11.04.\nBalogh Csaba — 8 óra 50 perc\nKovács Anna — 9 óra 20 perc";
        let drafts = extract(text, "Europe/Budapest", None, None);
        assert_eq!(drafts.len(), 2);
    }

    #[test]
    fn matches_by_neptun_id_when_name_absent() {
        let text = "2025.11.04.\nXYZ123 — 8 óra 50 perc";
        let drafts = extract(text, "Europe/Budapest", None, Some("xyz123"));
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn no_date_header_yields_no_drafts() {
        let text = "Balogh Csaba — 8 óra 50 perc";
        let drafts = extract(text, "Europe/Budapest", None, None);
        assert!(drafts.is_empty());
    }
}

//! Generic fallback extraction: no locale-specific pattern matched, so grep
//! for anything that looks like a date/time and emit a single low-confidence
//! draft around it. This only runs when every other deterministic extractor
//! came back empty (see [`super::extract`]).

use chrono::{DateTime, Duration, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;
use eventline_core::draft::Draft;
use eventline_core::models::EventType;
use regex::Regex;
use std::sync::OnceLock;

fn date_like_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}(?:\s+(?:at\s+)?\d{1,2}:\d{2}\s*(?:AM|PM)?)?")
            .unwrap()
    })
}

pub fn extract(text: &str, default_timezone: &str) -> Vec<Draft> {
    let Some(m) = date_like_pattern().find(text) else {
        return Vec::new();
    };

    let anchor = chrono::Local::now();
    let Ok(parsed) = parse_date_string(m.as_str(), anchor, Dialect::Us) else {
        return Vec::new();
    };
    let tz: Tz = default_timezone.parse().unwrap_or(chrono_tz::UTC);
    let start: DateTime<Utc> = parsed.with_timezone(&tz).with_timezone(&Utc);

    let title = first_meaningful_line(text).unwrap_or_else(|| "Untitled event".to_string());

    vec![Draft {
        event_type: Some(EventType::Event),
        title,
        start: Some(start),
        end: Some(start + Duration::hours(1)),
        timezone: Some(default_timezone.to_string()),
        labels: vec!["generic".to_string()],
        ..Default::default()
    }]
}

fn first_meaningful_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| {
            if line.len() > 80 {
                let cut = (0..=80).rev().find(|&i| line.is_char_boundary(i)).unwrap_or(0);
                format!("{}...", &line[..cut])
            } else {
                line.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_first_line_as_title() {
        let drafts = extract("Team offsite\nSee you 06/15/2026 at 10:00 AM", "UTC");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Team offsite");
        assert!(drafts[0].labels.contains(&"generic".to_string()));
    }

    #[test]
    fn no_date_like_token_yields_no_draft() {
        assert!(extract("Nothing date-shaped here.", "UTC").is_empty());
    }
}

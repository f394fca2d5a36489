//! C4: dedup/merge drafts from the deterministic and LLM extractors,
//! validate them, and score confidence.
//!
//! Grounded in the original's `merge_and_validate_events`: group by start
//! time rounded to the nearest 15 minutes, merge titles that overlap at
//! least half their words, prefer the deterministic draft as the merge
//! base, and union/concatenate the remaining fields. Diverges from the
//! original in one place, intentionally: `extraction_method` is tagged
//! `Hybrid` only when a merge actually combined a deterministic draft with
//! an LLM draft, not whenever an LLM draft happened to participate (the
//! original discards the per-event source tag before this decision can be
//! made correctly).

use chrono::{DateTime, Timelike, Utc};
use eventline_core::confidence::calculate_event_confidence;
use eventline_core::draft::{Draft, DraftContext, ExtractionSource};
use eventline_core::models::ExtractionMethod;
use std::collections::{HashMap, HashSet};

/// A draft that has passed validation and been scored.
#[derive(Debug, Clone)]
pub struct MergedEvent {
    pub draft: Draft,
    pub confidence: f32,
    pub extraction_method: ExtractionMethod,
}

/// Merge deterministic and LLM drafts, validate, and score each survivor.
pub fn merge_and_validate(
    deterministic: Vec<Draft>,
    llm: Vec<Draft>,
    ctx: DraftContext,
) -> Vec<MergedEvent> {
    let mut tagged: Vec<(Draft, ExtractionSource)> = Vec::new();
    tagged.extend(deterministic.into_iter().map(|d| (d, ExtractionSource::Deterministic)));
    tagged.extend(llm.into_iter().map(|d| (d, ExtractionSource::Llm)));

    let grouped = group_by_rounded_start(tagged);

    let mut merged_groups = Vec::new();
    for (_, group) in grouped {
        merged_groups.extend(merge_similar_titles(group));
    }

    merged_groups
        .into_iter()
        .filter_map(|(draft, source, is_hybrid)| validate(draft).map(|d| (d, source, is_hybrid)))
        .map(|(draft, source, is_hybrid)| {
            let confidence = calculate_event_confidence(&draft, source, is_hybrid, ctx);
            let extraction_method = if is_hybrid {
                ExtractionMethod::Hybrid
            } else {
                match source {
                    ExtractionSource::Deterministic => ExtractionMethod::Deterministic,
                    ExtractionSource::Llm => ExtractionMethod::Llm,
                }
            };
            MergedEvent {
                draft,
                confidence,
                extraction_method,
            }
        })
        .collect()
}

fn round_down_to_quarter_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    let minute = (dt.minute() / 15) * 15;
    dt.with_minute(minute)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

fn group_by_rounded_start(
    tagged: Vec<(Draft, ExtractionSource)>,
) -> HashMap<Option<DateTime<Utc>>, Vec<(Draft, ExtractionSource)>> {
    let mut groups: HashMap<Option<DateTime<Utc>>, Vec<(Draft, ExtractionSource)>> = HashMap::new();
    for (draft, source) in tagged {
        let key = draft.start.map(round_down_to_quarter_hour);
        groups.entry(key).or_default().push((draft, source));
    }
    groups
}

fn titles_similar(a: &str, b: &str) -> bool {
    let words_a: HashSet<&str> = a.to_lowercase().split_whitespace().collect::<Vec<_>>().into_iter().collect();
    let words_b: HashSet<&str> = b.to_lowercase().split_whitespace().collect::<Vec<_>>().into_iter().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return false;
    }
    let overlap = words_a.intersection(&words_b).count();
    let total = words_a.union(&words_b).count();
    (overlap as f64) / (total as f64) >= 0.5
}

/// Merges drafts within one time bucket whose titles overlap, returning
/// `(merged_draft, base_source, is_hybrid)` tuples. Each input draft's
/// owning string words are re-tokenized per comparison; this only runs on
/// small per-bucket groups so the cost is immaterial.
fn merge_similar_titles(
    group: Vec<(Draft, ExtractionSource)>,
) -> Vec<(Draft, ExtractionSource, bool)> {
    let mut processed = vec![false; group.len()];
    let mut result = Vec::new();

    for i in 0..group.len() {
        if processed[i] {
            continue;
        }
        let mut similar_indices = vec![i];
        for (j, item) in group.iter().enumerate().skip(i + 1) {
            if processed[j] {
                continue;
            }
            if titles_similar(&group[i].0.title, &item.0.title) {
                similar_indices.push(j);
                processed[j] = true;
            }
        }
        processed[i] = true;

        result.push(merge_group(&group, &similar_indices));
    }

    result
}

fn merge_group(
    group: &[(Draft, ExtractionSource)],
    indices: &[usize],
) -> (Draft, ExtractionSource, bool) {
    let mut members: Vec<usize> = indices.to_vec();
    members.sort_by_key(|&i| match group[i].1 {
        ExtractionSource::Deterministic => 0,
        ExtractionSource::Llm => 1,
    });

    let has_deterministic = members.iter().any(|&i| group[i].1 == ExtractionSource::Deterministic);
    let has_llm = members.iter().any(|&i| group[i].1 == ExtractionSource::Llm);
    let is_hybrid = members.len() > 1 && has_deterministic && has_llm;

    let base_source = group[members[0]].1;
    let mut base = group[members[0]].0.clone();

    for &idx in &members[1..] {
        let other = &group[idx].0;

        if base.event_type.is_none() {
            base.event_type = other.event_type;
        }
        if base.end.is_none() {
            base.end = other.end;
        }
        if base.timezone.is_none() {
            base.timezone = other.timezone.clone();
        }
        if base.location.is_none() {
            base.location = other.location.clone();
        }
        if base.online_url.is_none() {
            base.online_url = other.online_url.clone();
        }
        if base.recurrence.is_none() {
            base.recurrence = other.recurrence.clone();
        }
        if base.attendees.is_empty() {
            base.attendees = other.attendees.clone();
        }

        let mut labels: HashSet<String> = base.labels.iter().cloned().collect();
        labels.extend(other.labels.iter().cloned());
        base.labels = labels.into_iter().collect();

        let mut reminders_by_minutes: HashMap<u32, _> = base
            .reminders
            .iter()
            .cloned()
            .map(|r| (r.minutes, r))
            .collect();
        for reminder in &other.reminders {
            reminders_by_minutes.insert(reminder.minutes, reminder.clone());
        }
        base.reminders = reminders_by_minutes.into_values().collect();

        match (&base.notes, &other.notes) {
            (Some(base_notes), Some(other_notes)) if !base_notes.is_empty() && !other_notes.is_empty() => {
                base.notes = Some(format!("{base_notes}\n{other_notes}"));
            }
            (None, Some(_)) => base.notes = other.notes.clone(),
            _ => {}
        }
    }

    (base, base_source, is_hybrid)
}

fn validate(mut draft: Draft) -> Option<Draft> {
    if draft.title.trim().len() < 2 {
        return None;
    }
    if draft.start.is_none() {
        return None;
    }
    if draft.event_type.is_none() {
        draft.event_type = Some(eventline_core::models::EventType::Event);
    }
    if draft.timezone.is_none() {
        draft.timezone = Some("Europe/Budapest".to_string());
    }
    Some(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventline_core::models::{EventType, Reminder, ReminderMethod};

    fn base_draft(title: &str, minute: u32) -> Draft {
        Draft {
            event_type: Some(EventType::Event),
            title: title.to_string(),
            start: Some(
                Utc::now()
                    .with_minute(minute)
                    .unwrap()
                    .with_second(0)
                    .unwrap()
                    .with_nanosecond(0)
                    .unwrap(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn distinct_buckets_are_not_merged() {
        let a = base_draft("Budget review", 5);
        let b = base_draft("Budget review", 50);
        let merged = merge_and_validate(vec![a], vec![b], DraftContext::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn same_bucket_similar_titles_merge_into_one() {
        let mut a = base_draft("Quarterly Budget Review", 5);
        a.location = Some("Room A".to_string());
        let mut b = base_draft("Budget Review Meeting", 5);
        b.online_url = Some("https://meet.example.com/x".to_string());

        let merged = merge_and_validate(vec![a], vec![b], DraftContext::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].extraction_method, ExtractionMethod::Hybrid);
        assert_eq!(merged[0].draft.location.as_deref(), Some("Room A"));
        assert_eq!(
            merged[0].draft.online_url.as_deref(),
            Some("https://meet.example.com/x")
        );
    }

    #[test]
    fn reminders_merge_with_later_source_winning_on_duplicate_minutes() {
        let mut a = base_draft("Exam", 5);
        a.reminders = vec![Reminder {
            method: ReminderMethod::Popup,
            minutes: 30,
        }];
        let mut b = base_draft("Exam reminder", 5);
        b.reminders = vec![Reminder {
            method: ReminderMethod::Email,
            minutes: 30,
        }];

        let merged = merge_and_validate(vec![a], vec![b], DraftContext::default());
        assert_eq!(merged.len(), 1);
        let reminder = merged[0]
            .draft
            .reminders
            .iter()
            .find(|r| r.minutes == 30)
            .unwrap();
        assert_eq!(reminder.method, ReminderMethod::Email);
    }

    #[test]
    fn draft_with_empty_title_fails_validation_and_is_dropped() {
        let mut a = base_draft("x", 5);
        a.title = " ".to_string();
        let merged = merge_and_validate(vec![a], vec![], DraftContext::default());
        assert!(merged.is_empty());
    }

    #[test]
    fn draft_missing_start_fails_validation() {
        let mut a = base_draft("Valid title", 5);
        a.start = None;
        let merged = merge_and_validate(vec![a], vec![], DraftContext::default());
        assert!(merged.is_empty());
    }

    #[test]
    fn solo_deterministic_draft_is_tagged_deterministic_not_hybrid() {
        let a = base_draft("Solo event", 5);
        let merged = merge_and_validate(vec![a], vec![], DraftContext::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].extraction_method, ExtractionMethod::Deterministic);
    }
}

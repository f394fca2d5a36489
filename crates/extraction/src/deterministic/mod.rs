//! C2: deterministic, regex/date-grammar based extraction.
//!
//! Each locale module returns `Draft`s tagged `ExtractionSource::Deterministic`;
//! the language gate in [`extract`] decides which locale module(s) to run
//! based on script/keyword hints in the input text, mirroring the original's
//! per-locale pattern files.

pub mod english;
pub mod generic;
pub mod hungarian;

use eventline_core::draft::Draft;

/// Context a caller supplies so locale extractors can personalize matches
/// (e.g. filtering a shared exam-schedule table down to one student's row).
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub default_timezone: String,
    pub user_name: Option<String>,
    pub external_identity_key: Option<String>,
}

/// Runs every locale extractor whose language gate matches, then the
/// generic fallback, concatenating all drafts found. Unlike the LLM path,
/// this never makes a network call and never fails; an input with no
/// recognizable pattern simply yields an empty vec.
pub fn extract(text: &str, ctx: &ExtractionContext) -> Vec<Draft> {
    let mut drafts = Vec::new();

    if looks_hungarian(text) {
        drafts.extend(hungarian::extract(
            text,
            &ctx.default_timezone,
            ctx.user_name.as_deref(),
            ctx.external_identity_key.as_deref(),
        ));
    }

    drafts.extend(english::extract(text, &ctx.default_timezone));

    if drafts.is_empty() {
        drafts.extend(generic::extract(text, &ctx.default_timezone));
    }

    drafts
}

/// Fixed marker set that routes text to the Hungarian pattern set: any of
/// these words, matched as a case-insensitive substring, is enough.
const HUNGARIAN_MARKERS: &[&str] = &["óra", "perc", "neptun", "vizsga", "évfolyam", "terem", "hallgató"];

fn looks_hungarian(text: &str) -> bool {
    let lower = text.to_lowercase();
    HUNGARIAN_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hungarian_gate_triggers_on_marker_words() {
        assert!(looks_hungarian("8 óra 50 perc"));
        assert!(looks_hungarian("NEPTUN: ABC123"));
        assert!(looks_hungarian("vizsgaidőpont"));
    }

    #[test]
    fn hungarian_gate_does_not_trigger_on_plain_english() {
        assert!(!looks_hungarian("Meeting at 3pm tomorrow"));
    }

    #[test]
    fn empty_text_yields_generic_fallback_with_no_drafts() {
        let ctx = ExtractionContext {
            default_timezone: "UTC".into(),
            ..Default::default()
        };
        assert!(extract("", &ctx).is_empty());
    }
}

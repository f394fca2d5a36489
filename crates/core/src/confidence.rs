//! Confidence scoring (C4) and the auto-approval policy (C7).
//!
//! Ported field-for-field from the additive scoring formula this system was
//! distilled from: a base score built from which fields are present, a
//! bonus keyed on extraction provenance, and a final multiplicative
//! attenuation by OCR confidence when OCR was involved.

use crate::draft::{Draft, DraftContext, ExtractionSource};

/// Score a merged/validated draft in `[0.0, 1.0]` (P6).
pub fn calculate_event_confidence(
    draft: &Draft,
    source: ExtractionSource,
    is_hybrid: bool,
    ctx: DraftContext,
) -> f32 {
    let mut score = 0.0_f32;

    if draft.start.is_some() {
        score += 0.30;
    }
    if draft.end.is_some() {
        score += 0.05;
    }
    if draft.title.trim().len() > 3 {
        score += 0.20;
    }
    if draft.location.is_some() || draft.online_url.is_some() {
        score += 0.10;
    }

    score += if is_hybrid {
        0.25
    } else {
        match source {
            ExtractionSource::Deterministic => 0.20,
            ExtractionSource::Llm => 0.15,
        }
    };

    if ctx.trusted_sender {
        score += 0.05;
    }

    if let Some(ocr_confidence) = ctx.ocr_confidence {
        if ocr_confidence < 1.0 {
            score *= ocr_confidence;
        }
    }

    score.clamp(0.0, 1.0)
}

/// Whether an event should skip `PENDING_APPROVAL` and enter `APPROVED`
/// directly.
///
/// Requires `auto_approve_enabled` AND (`confidence >= 0.9` OR
/// (`trusted_sender` AND `confidence >= 0.7`)). Both thresholds are
/// inclusive (an event landing exactly on 0.9 auto-approves).
pub fn should_auto_approve(auto_approve_enabled: bool, confidence: f32, trusted_sender: bool) -> bool {
    auto_approve_enabled && (confidence >= 0.9 || (trusted_sender && confidence >= 0.7))
}

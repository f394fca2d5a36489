//! Pipeline Orchestrator (C5): the per-message job that turns a raw
//! [`Message`] into zero or more persisted [`Event`] drafts.
//!
//! Grounded in the original's `process_message` task: resolve the source
//! (website scrape overwrites the message body), OCR attachments without
//! letting one failure sink the job, run both extractors, merge/validate,
//! apply the auto-approval policy per event, and finalize the message
//! exactly once.

use chrono::Utc;
use eventline_core::config::CoreConfig;
use eventline_core::confidence::should_auto_approve;
use eventline_core::draft::DraftContext;
use eventline_core::models::{Attachment, EventStatus, EventType, ExtractionMethod, Message, MessageProvider};
use eventline_core::types::MessageId;
use eventline_extraction::deterministic::{self, ExtractionContext};
use eventline_extraction::llm::{LlmConfig, LlmExtractor};
use eventline_extraction::merger::merge_and_validate;
use eventline_extraction::ocr::{GoogleVisionOcr, OcrBackend, OcrRouter, OcrRouterConfig, TesseractOcr};
use eventline_providers::scraper::ScraperAdapter;
use eventline_shared::{jobs, repo};
use sqlx::PgPool;
use tracing::{info, warn};

/// Run the orchestrator for one message. Idempotent: a message already
/// marked `processed` returns immediately without touching anything (P5).
pub async fn process_message(pool: &PgPool, config: &CoreConfig, message_id: MessageId) -> anyhow::Result<()> {
    let Some(message) = repo::get_message(pool, message_id).await? else {
        warn!("process_message: message {} not found, dropping job", message_id);
        return Ok(());
    };
    if message.processed {
        info!("process_message: message {} already processed, skipping", message_id);
        return Ok(());
    }

    let result = run_pipeline(pool, config, message).await;

    match result {
        Ok(PipelineOutcome { events_created }) => {
            info!(
                "process_message: finalized message {} with {} event(s)",
                message_id, events_created
            );
            repo::mark_message_processed(pool, message_id, None).await?;
            Ok(())
        }
        Err(e) => {
            repo::mark_message_processed(pool, message_id, Some(e.to_string())).await?;
            Err(e)
        }
    }
}

struct PipelineOutcome {
    events_created: usize,
}

async fn run_pipeline(pool: &PgPool, config: &CoreConfig, mut message: Message) -> anyhow::Result<PipelineOutcome> {
    let user = repo::get_user(pool, message.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("message {} has no owning user", message.id))?;

    // Stage 1: resolve source. A `website` message's body_text is a URL.
    if message.provider == MessageProvider::Website {
        let url = message.body_text.clone().unwrap_or_default();
        let scraper = ScraperAdapter::new()?;
        let scraped = scraper.scrape(&url).await;
        if !scraped.ok {
            return Err(anyhow::anyhow!(
                "scrape failed for {}: {}",
                url,
                scraped.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        let links: Vec<String> = scraped.links.into_iter().take(50).map(|l| l.url).collect();
        repo::overwrite_scraped_message(
            pool,
            message.id,
            scraped.title.as_deref().unwrap_or_default(),
            scraped.text.as_deref().unwrap_or_default(),
            scraped.html.as_deref().unwrap_or_default(),
            links,
        )
        .await?;
        message.subject = scraped.title;
        message.body_text = scraped.text;
        message.body_html = scraped.html;
    }

    // Stage 2: OCR attachments. Per-attachment failure is logged and
    // skipped -- it never aborts the job.
    let mut full_text = message.body_text.clone().unwrap_or_default();
    let mut ocr_confidences: Vec<f32> = Vec::new();
    let mut updated_attachments = message.attachments.0.clone();

    let http = reqwest::Client::new();
    let ocr_router = OcrRouter::new(
        Box::new(TesseractOcr::new()),
        config.enable_google_vision.then(|| {
            Box::new(GoogleVisionOcr::new(
                http.clone(),
                config.google_vision_credentials.clone().unwrap_or_default(),
            )) as Box<dyn OcrBackend>
        }),
        OcrRouterConfig {
            ocr_confidence_threshold: config.ocr_confidence_threshold,
            premium_enabled: config.enable_google_vision,
        },
    );

    for attachment in &mut updated_attachments {
        if let Attachment::File {
            filename,
            path,
            ocr_text,
            ocr_confidence,
            ..
        } = attachment
        {
            match tokio::fs::read(&path).await {
                Ok(bytes) => match ocr_router.extract(&bytes, true).await {
                    Ok(result) => {
                        full_text.push_str(&format!("\n\n--- {filename} ---\n{}", result.text));
                        ocr_confidences.push(result.confidence);
                        *ocr_text = Some(result.text);
                        *ocr_confidence = Some(result.confidence);
                    }
                    Err(e) => {
                        warn!("OCR failed for attachment {}: {}", filename, e);
                    }
                },
                Err(e) => {
                    warn!("failed to read attachment {} at {}: {}", filename, path, e);
                }
            }
        }
    }
    if !updated_attachments.is_empty() {
        repo::update_attachment_ocr(pool, message.id, updated_attachments).await?;
    }

    let ocr_confidence_summary = ocr_confidences.iter().cloned().fold(1.0_f32, f32::min);
    if !ocr_confidences.is_empty() {
        repo::set_message_ocr_confidence(pool, message.id, (ocr_confidence_summary * 100.0) as i16).await?;
    }

    // Stage 3: extract.
    let extraction_ctx = ExtractionContext {
        default_timezone: user.default_timezone.clone(),
        user_name: user.preferred_name.clone(),
        external_identity_key: user.external_identity_key.clone(),
    };
    let deterministic_drafts = deterministic::extract(&full_text, &extraction_ctx);

    let llm_extractor = LlmExtractor::new(
        http.clone(),
        LlmConfig {
            api_key: config.openai_api_key.clone(),
            enabled: config.enable_llm_fallback,
            model: config.openai_model.clone(),
            max_tokens: config.openai_max_tokens,
            base_url: config.openai_base_url.clone(),
        },
    );
    let llm_context = serde_json::json!({
        "sender": message.sender_email,
        "provider": format!("{:?}", message.provider).to_lowercase(),
    });
    let llm_drafts = llm_extractor
        .extract(&full_text, &user.default_timezone, Some(&llm_context))
        .await;

    // Stage 4: merge.
    let trusted_sender = message
        .sender_email
        .as_deref()
        .map(|addr| user.trusted_sender_domains.0.iter().any(|d| addr.ends_with(d.as_str())))
        .unwrap_or(false);
    let draft_ctx = DraftContext {
        trusted_sender,
        ocr_confidence: (!ocr_confidences.is_empty()).then_some(ocr_confidence_summary),
    };
    let merged = merge_and_validate(deterministic_drafts, llm_drafts, draft_ctx);

    // Stage 5: persist, applying the auto-approval policy per event.
    let mut events_created = 0usize;
    for m in merged {
        let auto_approved = should_auto_approve(user.auto_approve_enabled, m.confidence, trusted_sender);
        let status = if auto_approved {
            EventStatus::Approved
        } else {
            EventStatus::PendingApproval
        };

        let event = repo::create_event(
            pool,
            repo::NewEvent {
                user_id: user.id,
                source_message_id: Some(message.id),
                event_type: m.draft.event_type.unwrap_or(EventType::Event),
                title: m.draft.title,
                start: m.draft.start.unwrap_or_else(Utc::now),
                end: m.draft.end,
                allday: m.draft.allday,
                timezone: m.draft.timezone.unwrap_or_else(|| user.default_timezone.clone()),
                location: m.draft.location,
                online_url: m.draft.online_url,
                notes: m.draft.notes,
                attendees: sqlx::types::Json(m.draft.attendees),
                reminders: sqlx::types::Json(m.draft.reminders),
                recurrence: m.draft.recurrence,
                labels: sqlx::types::Json(m.draft.labels),
                confidence: m.confidence,
                extraction_method: m.extraction_method,
                provider: Some(message.provider),
                status,
                approved_at: auto_approved.then(Utc::now),
            },
        )
        .await?;

        if auto_approved {
            jobs::enqueue_sync_event(pool, event.id, None).await?;
        }
        events_created += 1;
    }

    Ok(PipelineOutcome { events_created })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_outcome_counts_events() {
        let outcome = PipelineOutcome { events_created: 3 };
        assert_eq!(outcome.events_created, 3);
    }
}

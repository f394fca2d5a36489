//! C3: LLM fallback extraction via an OpenAI-compatible chat-completions
//! endpoint. Grounded in the original's `extract_events_llm`: same system
//! prompt, same low temperature, same unconditional "[Extracted by AI]"
//! notes suffix, same swallow-everything-to-empty-vec error policy (a
//! human reviews drafts downstream, so a quiet failure here just means
//! fewer candidates for the merger rather than a broken pipeline).

use chrono::Utc;
use eventline_core::draft::Draft;
use eventline_core::models::{EventAttendee, EventType, Reminder, ReminderMethod};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = r#"You are an expert at extracting calendar events and tasks from text.

Extract events/tasks and return them as JSON matching this schema:
{
  "events": [
    {
      "type": "event" | "task",
      "title": "string",
      "start": "ISO-8601 datetime",
      "end": "ISO-8601 datetime or null",
      "allday": boolean,
      "timezone": "IANA timezone (default: Europe/Budapest)",
      "location": "string or null",
      "online_url": "string or null",
      "notes": "string or null",
      "attendees": [{"name": "", "email": ""}],
      "reminders": [{"method": "popup", "minutes": 30}],
      "labels": ["exam", "meeting", "deadline", etc.]
    }
  ]
}

Rules:
- Honor locales: if date like "2025.11.04." and time "8 ora 50 perc", use Europe/Budapest timezone
- Extract ALL events you find, not just one
- If time is ambiguous, note it in "notes"
- Never invent locations - only extract if explicitly mentioned
- For exams, add smart reminders: -1 day, -2 hours, -30 minutes
- For flights, add: -24h (check-in), -3h, -1h
- Return empty array if no events found
"#;

/// Configuration for the LLM client, sourced from `CoreConfig`'s
/// `OPENAI_*` env vars.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

pub struct LlmExtractor {
    http: reqwest::Client,
    config: LlmConfig,
}

#[derive(Deserialize)]
struct RawReminder {
    method: String,
    minutes: u32,
}

#[derive(Deserialize)]
struct RawAttendee {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    title: Option<String>,
    start: Option<String>,
    end: Option<String>,
    #[serde(default)]
    allday: bool,
    timezone: Option<String>,
    location: Option<String>,
    online_url: Option<String>,
    notes: Option<String>,
    #[serde(default)]
    attendees: Vec<RawAttendee>,
    #[serde(default)]
    reminders: Vec<RawReminder>,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Deserialize, Default)]
struct RawEventsEnvelope {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl LlmExtractor {
    pub fn new(http: reqwest::Client, config: LlmConfig) -> Self {
        Self { http, config }
    }

    /// Extract events from free text. Per the original: a missing API key,
    /// a disabled feature flag, or any request/parse failure all resolve
    /// to an empty vec rather than an error — the merger treats "no LLM
    /// drafts" the same whether the feature is off or it just failed.
    pub async fn extract(
        &self,
        text: &str,
        default_timezone: &str,
        context: Option<&serde_json::Value>,
    ) -> Vec<Draft> {
        let Some(api_key) = self.config.api_key.as_ref().filter(|k| !k.is_empty()) else {
            tracing::warn!("OpenAI API key not configured, skipping LLM extraction");
            return Vec::new();
        };
        if !self.config.enabled {
            tracing::info!("LLM fallback disabled in config");
            return Vec::new();
        }

        match self
            .call(api_key, text, default_timezone, context)
            .await
        {
            Ok(events) => {
                tracing::info!(count = events.len(), "LLM extracted events");
                events
                    .into_iter()
                    .map(|raw| to_draft(raw, default_timezone))
                    .collect()
            }
            Err(err) => {
                tracing::error!(error = %err, "LLM extraction error");
                Vec::new()
            }
        }
    }

    async fn call(
        &self,
        api_key: &str,
        text: &str,
        default_timezone: &str,
        context: Option<&serde_json::Value>,
    ) -> anyhow::Result<Vec<RawEvent>> {
        let mut user_prompt = format!("Extract calendar events from this text:\n\n{text}");
        if let Some(ctx) = context {
            user_prompt.push_str(&format!(
                "\n\nContext: {}",
                serde_json::to_string_pretty(ctx)?
            ));
        }
        user_prompt.push_str(&format!("\n\nDefault timezone: {default_timezone}"));

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": 0.1,
            "max_tokens": self.config.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("LLM endpoint returned {}", response.status());
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let envelope: RawEventsEnvelope = serde_json::from_str(&content)?;
        Ok(envelope.events)
    }
}

fn to_draft(raw: RawEvent, default_timezone: &str) -> Draft {
    let event_type = match raw.event_type.as_deref() {
        Some("task") => EventType::Task,
        _ => EventType::Event,
    };

    let start = raw
        .start
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let end = raw
        .end
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut notes = raw.notes.unwrap_or_default();
    notes.push_str("\n[Extracted by AI]");

    Draft {
        event_type: Some(event_type),
        title: raw.title.unwrap_or_default(),
        start,
        end,
        allday: raw.allday,
        timezone: raw.timezone.or_else(|| Some(default_timezone.to_string())),
        location: raw.location,
        online_url: raw.online_url,
        notes: Some(notes),
        attendees: raw
            .attendees
            .into_iter()
            .map(|a| EventAttendee {
                name: a.name.unwrap_or_default(),
                email: a.email.unwrap_or_default(),
            })
            .collect(),
        reminders: raw
            .reminders
            .into_iter()
            .map(|r| Reminder {
                method: if r.method.eq_ignore_ascii_case("email") {
                    ReminderMethod::Email
                } else {
                    ReminderMethod::Popup
                },
                minutes: r.minutes,
            })
            .collect(),
        recurrence: None,
        labels: raw.labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            enabled: true,
            api_key: Some("test-key".to_string()),
            base_url,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn missing_api_key_returns_empty_without_request() {
        let extractor = LlmExtractor::new(
            reqwest::Client::new(),
            LlmConfig {
                api_key: None,
                ..config("http://localhost".to_string())
            },
        );
        let drafts = extractor.extract("some text", "UTC", None).await;
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn disabled_flag_returns_empty_without_request() {
        let extractor = LlmExtractor::new(
            reqwest::Client::new(),
            LlmConfig {
                enabled: false,
                ..config("http://localhost".to_string())
            },
        );
        let drafts = extractor.extract("some text", "UTC", None).await;
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn successful_response_yields_drafts_with_ai_suffix() {
        let server = MockServer::start().await;
        let payload = serde_json::json!({
            "choices": [{
                "message": {
                    "content": serde_json::json!({
                        "events": [{
                            "type": "event",
                            "title": "Design review",
                            "start": "2026-08-01T10:00:00Z",
                            "end": "2026-08-01T11:00:00Z",
                            "allday": false,
                            "timezone": "UTC",
                            "reminders": [{"method": "popup", "minutes": 30}]
                        }]
                    }).to_string()
                }
            }]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload))
            .mount(&server)
            .await;

        let extractor = LlmExtractor::new(reqwest::Client::new(), config(server.uri()));
        let drafts = extractor.extract("some text", "UTC", None).await;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Design review");
        assert_eq!(drafts[0].notes.as_deref(), Some("\n[Extracted by AI]"));
    }

    #[tokio::test]
    async fn upstream_error_response_yields_empty_vec() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let extractor = LlmExtractor::new(reqwest::Client::new(), config(server.uri()));
        let drafts = extractor.extract("some text", "UTC", None).await;
        assert!(drafts.is_empty());
    }
}

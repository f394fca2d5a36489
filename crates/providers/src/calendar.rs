//! C8 Calendar adapter: Google Calendar REST API.
//!
//! Grounded in the original's `GoogleCalendarService`: plain bearer-token
//! HTTP calls against `calendar/v3`, no OAuth client id/secret on the
//! request path (the original builds `Credentials` with empty client id
//! and secret strings and relies on a refresh-only flow — see
//! `DESIGN.md`). Event translation (canonical -> provider JSON) lives in
//! the sync engine (C6); this adapter only knows how to move already-built
//! provider JSON across the wire.

use eventline_core::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCalendar {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ProviderCalendarEntry>,
}

#[derive(Debug, Deserialize)]
struct ProviderCalendarEntry {
    id: String,
    summary: String,
    #[serde(default, rename = "backgroundColor")]
    background_color: Option<String>,
    #[serde(default)]
    primary: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    error: GoogleApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleApiErrorBody {
    code: u16,
    #[serde(default)]
    message: String,
}

/// A provider-format calendar event body, already translated from a
/// canonical event by the caller (the sync engine). Opaque here: the
/// adapter neither reads nor validates its shape beyond serializing it.
pub type ProviderEventBody = serde_json::Value;

pub struct GoogleCalendarAdapter {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarAdapter {
    pub fn new(http: reqwest::Client, access_token: String) -> Self {
        Self {
            http,
            access_token,
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Constructs an adapter pointed at a different base URL; used in
    /// tests to target a mock server instead of the real Calendar API.
    pub fn with_base_url(http: reqwest::Client, access_token: String, base_url: String) -> Self {
        Self {
            http,
            access_token,
            base_url,
        }
    }

    pub async fn list_calendars(&self) -> CoreResult<Vec<ProviderCalendar>> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/users/me/calendarList");
        let response = self.send(self.http.get(&url)).await?;
        let body: CalendarListResponse = self.parse_json(response).await?;
        Ok(body
            .items
            .into_iter()
            .map(|c| ProviderCalendar {
                id: c.id,
                summary: c.summary,
                background_color: c.background_color,
                primary: c.primary,
            })
            .collect())
    }

    pub async fn create(&self, calendar_id: &str, event: &ProviderEventBody) -> CoreResult<String> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/calendars/{calendar_id}/events");
        let response = self.send(self.http.post(&url).json(event)).await?;
        let created: CreatedEvent = self.parse_json(response).await?;
        Ok(created.id)
    }

    pub async fn update(
        &self,
        calendar_id: &str,
        external_event_id: &str,
        event: &ProviderEventBody,
    ) -> CoreResult<()> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/calendars/{calendar_id}/events/{external_event_id}");
        let response = self.send(self.http.put(&url).json(event)).await?;
        self.parse_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    pub async fn delete(&self, calendar_id: &str, external_event_id: &str) -> CoreResult<()> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/calendars/{calendar_id}/events/{external_event_id}");
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Calendar delete request failed: {e}")))?;

        // Google returns 410 Gone for an already-deleted event; treat as success.
        if response.status().is_success() || response.status().as_u16() == 410 {
            return Ok(());
        }
        Err(self.classify_error(response.status().as_u16(), response.text().await.unwrap_or_default()))
    }

    pub async fn get(&self, calendar_id: &str, external_event_id: &str) -> CoreResult<ProviderEventBody> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/calendars/{calendar_id}/events/{external_event_id}");
        let response = self.send(self.http.get(&url)).await?;
        self.parse_json(response).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> CoreResult<reqwest::Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Calendar request failed: {e}")))?;

        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(self.classify_error(status, body))
    }

    async fn parse_json<T: for<'de> Deserialize<'de>>(&self, response: reqwest::Response) -> CoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Calendar response invalid: {e}")))
    }

    /// 4xx (excluding 429) is a non-retryable provider rejection; anything
    /// else (5xx, 429, transport-level) is treated as transient.
    fn classify_error(&self, status: u16, body: String) -> CoreError {
        let message: String = serde_json::from_str::<GoogleApiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        if (400..500).contains(&status) && status != 429 {
            CoreError::UpstreamRejected(format!("Calendar API returned {status}: {message}"))
        } else {
            CoreError::UpstreamUnavailable(format!("Calendar API returned {status}: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_sends_bearer_token_and_returns_external_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "ext-1"})))
            .mount(&server)
            .await;

        let adapter =
            GoogleCalendarAdapter::with_base_url(reqwest::Client::new(), "test-token".to_string(), server.uri());
        let id = adapter
            .create("primary", &serde_json::json!({"summary": "Meeting"}))
            .await
            .unwrap();
        assert_eq!(id, "ext-1");
    }

    #[tokio::test]
    async fn delete_treats_410_gone_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/ext-1"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let adapter =
            GoogleCalendarAdapter::with_base_url(reqwest::Client::new(), "test-token".to_string(), server.uri());
        assert!(adapter.delete("primary", "ext-1").await.is_ok());
    }

    #[tokio::test]
    async fn four_xx_classifies_as_rejected_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "bad request"}
            })))
            .mount(&server)
            .await;

        let adapter =
            GoogleCalendarAdapter::with_base_url(reqwest::Client::new(), "test-token".to_string(), server.uri());
        let err = adapter
            .create("primary", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UpstreamRejected(_)));
    }

    #[tokio::test]
    async fn five_xx_classifies_as_unavailable_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter =
            GoogleCalendarAdapter::with_base_url(reqwest::Client::new(), "test-token".to_string(), server.uri());
        let err = adapter
            .create("primary", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    }
}

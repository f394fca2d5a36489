//! C8 Mail adapter: Gmail REST API.
//!
//! Grounded in the original's `GmailService`: `users.messages.get` with
//! `format=full`, recursive MIME `parts` walk collecting `text/plain`,
//! `text/html`, and named-filename attachment stubs, plus `watch`/`stop`
//! push-notification toggles. Authenticates with a bearer token the caller
//! already holds (sealed/opened the same way as the calendar adapter),
//! since the original's OAuth client id/secret are unused for API calls.

use eventline_core::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Debug, Clone, Serialize)]
pub struct ParsedAttachment {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub attachment_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedMessage {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    pub body_text: String,
    pub body_html: String,
    pub attachments: Vec<ParsedAttachment>,
}

#[derive(Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct GmailBody {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default, rename = "attachmentId")]
    attachment_id: Option<String>,
}

#[derive(Deserialize)]
struct GmailPart {
    #[serde(default, rename = "mimeType")]
    mime_type: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    body: Option<GmailBody>,
    #[serde(default)]
    parts: Option<Vec<GmailPart>>,
    #[serde(default)]
    headers: Option<Vec<GmailHeader>>,
}

#[derive(Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: String,
    payload: GmailPart,
}

pub struct GmailAdapter {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailAdapter {
    pub fn new(http: reqwest::Client, access_token: String) -> Self {
        Self {
            http,
            access_token,
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    /// Constructs an adapter pointed at a different base URL; used in tests
    /// to target a mock server instead of the real Gmail API.
    pub fn with_base_url(http: reqwest::Client, access_token: String, base_url: String) -> Self {
        Self {
            http,
            access_token,
            base_url,
        }
    }

    pub async fn fetch(&self, message_external_id: &str) -> CoreResult<ParsedMessage> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/users/me/messages/{message_external_id}?format=full");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Gmail request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "Gmail API returned {}",
                response.status()
            )));
        }

        let message: GmailMessage = response
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Gmail response invalid: {e}")))?;

        Ok(parse_message(message))
    }

    pub async fn watch(&self, _webhook_url: &str) -> CoreResult<serde_json::Value> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/users/me/watch");
        let body = serde_json::json!({
            "labelIds": ["INBOX"],
            "topicName": "projects/eventline/topics/gmail-notifications",
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Gmail watch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "Gmail watch returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Gmail watch response invalid: {e}")))
    }

    pub async fn stop(&self) -> CoreResult<()> {
        let base_url = &self.base_url;
        let url = format!("{base_url}/users/me/stop");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Gmail stop failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "Gmail stop returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn header_value<'a>(headers: &'a [GmailHeader], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or_default()
}

fn decode_base64url(data: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE
        .decode(data)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn parse_message(message: GmailMessage) -> ParsedMessage {
    let headers = message.payload.headers.as_deref().unwrap_or_default();
    let mut parsed = ParsedMessage {
        id: message.id,
        thread_id: message.thread_id,
        subject: header_value(headers, "Subject").to_string(),
        from: header_value(headers, "From").to_string(),
        to: header_value(headers, "To").to_string(),
        date: header_value(headers, "Date").to_string(),
        ..Default::default()
    };

    if let Some(parts) = &message.payload.parts {
        extract_parts(parts, &mut parsed);
    } else if let Some(body) = &message.payload.body {
        if let Some(data) = &body.data {
            parsed.body_text = decode_base64url(data);
        }
    }

    parsed
}

fn extract_parts(parts: &[GmailPart], parsed: &mut ParsedMessage) {
    for part in parts {
        match part.mime_type.as_str() {
            "text/plain" => {
                if let Some(body) = &part.body {
                    if let Some(data) = &body.data {
                        parsed.body_text.push_str(&decode_base64url(data));
                    }
                }
            }
            "text/html" => {
                if let Some(body) = &part.body {
                    if let Some(data) = &body.data {
                        parsed.body_html.push_str(&decode_base64url(data));
                    }
                }
            }
            _ => {}
        }

        if !part.filename.is_empty() {
            if let Some(body) = &part.body {
                if let Some(attachment_id) = &body.attachment_id {
                    parsed.attachments.push(ParsedAttachment {
                        filename: part.filename.clone(),
                        mime_type: part.mime_type.clone(),
                        size: body.size,
                        attachment_id: attachment_id.clone(),
                    });
                }
            }
        }

        if let Some(nested) = &part.parts {
            extract_parts(nested, parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base64url_decodes_plain_text() {
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE,
            b"hello world",
        );
        assert_eq!(decode_base64url(&encoded), "hello world");
    }

    #[test]
    fn parses_nested_parts_collecting_text_and_attachments() {
        let message = GmailMessage {
            id: "m1".into(),
            thread_id: "t1".into(),
            payload: GmailPart {
                mime_type: "multipart/mixed".into(),
                filename: String::new(),
                body: None,
                headers: Some(vec![GmailHeader {
                    name: "Subject".into(),
                    value: "Hello".into(),
                }]),
                parts: Some(vec![
                    GmailPart {
                        mime_type: "text/plain".into(),
                        filename: String::new(),
                        body: Some(GmailBody {
                            data: Some(base64::Engine::encode(
                                &base64::engine::general_purpose::URL_SAFE,
                                b"body text",
                            )),
                            size: 9,
                            attachment_id: None,
                        }),
                        parts: None,
                        headers: None,
                    },
                    GmailPart {
                        mime_type: "application/pdf".into(),
                        filename: "schedule.pdf".into(),
                        body: Some(GmailBody {
                            data: None,
                            size: 1024,
                            attachment_id: Some("att1".into()),
                        }),
                        parts: None,
                        headers: None,
                    },
                ]),
            },
        };

        let parsed = parse_message(message);
        assert_eq!(parsed.subject, "Hello");
        assert_eq!(parsed.body_text, "body text");
        assert_eq!(parsed.attachments.len(), 1);
        assert_eq!(parsed.attachments[0].filename, "schedule.pdf");
    }

    #[tokio::test]
    async fn fetch_sends_bearer_token_and_parses_response() {
        let server = MockServer::start().await;
        let payload = serde_json::json!({
            "id": "m1",
            "threadId": "t1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [{"name": "Subject", "value": "Test"}],
                "body": {"data": base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE, b"hi")}
            }
        });

        Mock::given(method("GET"))
            .and(path("/users/me/messages/abc123"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload))
            .mount(&server)
            .await;

        let adapter = GmailAdapter::with_base_url(
            reqwest::Client::new(),
            "test-token".to_string(),
            server.uri(),
        );
        let parsed = adapter.fetch("abc123").await.unwrap();
        assert_eq!(parsed.subject, "Test");
        assert_eq!(parsed.body_text, "hi");
    }
}

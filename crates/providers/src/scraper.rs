//! C8 Scraper adapter: fetch a URL and extract readable text/links.
//!
//! Grounded in the original's `WebScraperService.scrape_url`: strip
//! `<script>`/`<style>`/`<nav>`/`<footer>`/`<header>` before taking text,
//! keep only `http`/`//`-prefixed anchors, collapse blank lines.

use scraper::{Html, Selector};
use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScrapedLink {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScrapeResult {
    pub ok: bool,
    pub url: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub links: Vec<ScrapedLink>,
    pub error: Option<String>,
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub struct ScraperAdapter {
    http: reqwest::Client,
}

impl ScraperAdapter {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http })
    }

    pub async fn scrape(&self, url: &str) -> ScrapeResult {
        if url::Url::parse(url).is_err() {
            return ScrapeResult {
                ok: false,
                url: url.to_string(),
                title: None,
                text: None,
                html: None,
                links: vec![],
                error: Some("Invalid URL format".to_string()),
            };
        }

        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return ScrapeResult {
                    ok: false,
                    url: url.to_string(),
                    title: None,
                    text: None,
                    html: None,
                    links: vec![],
                    error: Some("Request timeout".to_string()),
                };
            }
            Err(e) => {
                return ScrapeResult {
                    ok: false,
                    url: url.to_string(),
                    title: None,
                    text: None,
                    html: None,
                    links: vec![],
                    error: Some(format!("Request failed: {e}")),
                };
            }
        };

        if !response.status().is_success() {
            return ScrapeResult {
                ok: false,
                url: url.to_string(),
                title: None,
                text: None,
                html: None,
                links: vec![],
                error: Some(format!("HTTP status {}", response.status())),
            };
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return ScrapeResult {
                    ok: false,
                    url: url.to_string(),
                    title: None,
                    text: None,
                    html: None,
                    links: vec![],
                    error: Some(format!("Failed to read response body: {e}")),
                };
            }
        };

        self.parse(url, &body)
    }

    fn parse(&self, url: &str, body: &str) -> ScrapeResult {
        let document = Html::parse_document(body);

        let title_selector = Selector::parse("title").unwrap();
        let title = document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let strip_selector = Selector::parse("script, style, nav, footer, header").unwrap();
        let stripped: std::collections::HashSet<_> = document
            .select(&strip_selector)
            .map(|el| el.id())
            .collect();

        let text = extract_text_excluding(&document, &stripped);

        let link_selector = Selector::parse("a[href]").unwrap();
        let links = document
            .select(&link_selector)
            .filter_map(|el| {
                let href = el.value().attr("href")?;
                if href.starts_with("http") || href.starts_with("//") {
                    Some(ScrapedLink {
                        url: href.to_string(),
                        text: el.text().collect::<String>().trim().to_string(),
                    })
                } else {
                    None
                }
            })
            .collect();

        ScrapeResult {
            ok: true,
            url: url.to_string(),
            title: Some(title.unwrap_or_else(|| "Untitled".to_string())),
            text: Some(text),
            html: Some(body.to_string()),
            links,
            error: None,
        }
    }
}

impl Default for ScraperAdapter {
    fn default() -> Self {
        Self::new().expect("reqwest client builder should not fail with static config")
    }
}

fn extract_text_excluding(
    document: &Html,
    excluded: &std::collections::HashSet<ego_tree::NodeId>,
) -> String {
    let mut lines = Vec::new();
    collect_text(document.tree.root(), excluded, &mut lines);
    lines
        .into_iter()
        .filter(|l: &String| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(
    node: ego_tree::NodeRef<'_, scraper::Node>,
    excluded: &std::collections::HashSet<ego_tree::NodeId>,
    out: &mut Vec<String>,
) {
    if excluded.contains(&node.id()) {
        return;
    }
    if let Some(text) = node.value().as_text() {
        out.push(text.trim().to_string());
    }
    for child in node.children() {
        collect_text(child, excluded, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn invalid_url_fails_fast_without_request() {
        let adapter = ScraperAdapter::new().unwrap();
        let result = adapter.scrape("not a url").await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("Invalid URL format"));
    }

    #[tokio::test]
    async fn strips_script_and_nav_and_extracts_links() {
        let server = MockServer::start().await;
        let html = r#"
            <html><head><title>Demo Page</title></head>
            <body>
                <nav>Site nav</nav>
                <script>var x = 1;</script>
                <p>Hello world</p>
                <a href="https://example.com/page">External link</a>
                <a href="/relative">Relative link</a>
            </body></html>
        "#;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let adapter = ScraperAdapter::new().unwrap();
        let result = adapter.scrape(&format!("{}/page", server.uri())).await;

        assert!(result.ok);
        assert_eq!(result.title.as_deref(), Some("Demo Page"));
        let text = result.text.unwrap();
        assert!(text.contains("Hello world"));
        assert!(!text.contains("Site nav"));
        assert!(!text.contains("var x"));
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].url, "https://example.com/page");
    }

    #[tokio::test]
    async fn non_success_status_is_reported_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = ScraperAdapter::new().unwrap();
        let result = adapter.scrape(&format!("{}/missing", server.uri())).await;
        assert!(!result.ok);
    }
}

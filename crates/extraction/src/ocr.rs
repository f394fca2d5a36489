//! OCR Router (C1): selects between a local, free OCR backend and a premium
//! cloud backend based on confidence, and rasterizes PDFs page-by-page.

use eventline_core::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// One OCR'd region of text, optionally positioned and page-tagged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OcrBlock {
    pub text: String,
    pub confidence: f32,
    /// `(left, top, width, height)` in pixels, when the backend reports one.
    pub bbox: Option<(u32, u32, u32, u32)>,
    /// 1-indexed page number; `None` for single-image input.
    pub page: Option<u32>,
}

/// The result of one OCR pass over one image.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f32,
    pub blocks: Vec<OcrBlock>,
    pub language: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A single OCR backend. Implementors never retry or route; that's the
/// router's job.
#[async_trait::async_trait]
pub trait OcrBackend: Send + Sync {
    async fn extract(&self, image_bytes: &[u8]) -> CoreResult<OcrResult>;
}

/// Local, free OCR backed by the system `tesseract` binary.
///
/// Grounded in the original's `tesseract.py`: runs with `eng+hun` so both
/// English and Hungarian exam-schedule text are recognized, and derives a
/// scalar confidence from tesseract's per-word TSV output, averaged over
/// words with a reported confidence.
pub struct TesseractOcr;

impl TesseractOcr {
    pub fn new() -> Self {
        Self
    }

    async fn run_tesseract(&self, image_bytes: &[u8], args: &[&str]) -> CoreResult<String> {
        let tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| CoreError::OcrUnavailable(format!("failed to create temp file: {e}")))?;
        tokio::fs::write(tmp.path(), image_bytes)
            .await
            .map_err(|e| CoreError::OcrUnavailable(format!("failed to write temp file: {e}")))?;

        let output = Command::new("tesseract")
            .arg(tmp.path())
            .arg("stdout")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| CoreError::OcrUnavailable(format!("failed to spawn tesseract: {e}")))?;

        if !output.status.success() {
            return Err(CoreError::OcrUnavailable(format!(
                "tesseract exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parse tesseract's `-c tsv` word table, averaging the per-word
    /// confidence column (0-100) and scaling to `[0, 1]`. Words tesseract
    /// reports with confidence `-1` (no text detected there) are skipped.
    fn parse_tsv_confidence(tsv: &str) -> f32 {
        let mut total = 0.0_f64;
        let mut count = 0u32;
        for line in tsv.lines().skip(1) {
            let cols: Vec<&str> = line.split('\t').collect();
            // conf is column index 10 in tesseract's standard TSV layout.
            if let Some(conf_str) = cols.get(10) {
                if let Ok(conf) = conf_str.trim().parse::<f64>() {
                    if conf >= 0.0 {
                        total += conf;
                        count += 1;
                    }
                }
            }
        }
        if count == 0 {
            0.5
        } else {
            ((total / f64::from(count)) / 100.0) as f32
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl OcrBackend for TesseractOcr {
    async fn extract(&self, image_bytes: &[u8]) -> CoreResult<OcrResult> {
        let text = self
            .run_tesseract(image_bytes, &["-l", "eng+hun"])
            .await?;
        let tsv = self
            .run_tesseract(image_bytes, &["-l", "eng+hun", "tsv"])
            .await
            .unwrap_or_default();
        let confidence = Self::parse_tsv_confidence(&tsv);

        let mut metadata = serde_json::Map::new();
        metadata.insert("provider".into(), "tesseract".into());

        Ok(OcrResult {
            text,
            confidence,
            blocks: vec![],
            language: None,
            metadata,
        })
    }
}

/// Premium, cloud-based OCR via the Google Cloud Vision REST API.
///
/// `credentials_path` is, despite the `GOOGLE_VISION_CREDENTIALS` env var's
/// name, a path to a service-account key file rather than an inline key —
/// preserved verbatim from the original (see `DESIGN.md`, §9 Open
/// Questions). This adapter reads the key file's `client_email`/access is
/// delegated to a bearer token the caller already holds; in this codebase
/// that's sourced the same way the calendar adapter sources its bearer
/// token, via `eventline_core::security::TokenSealer`.
pub struct GoogleVisionOcr {
    http: reqwest::Client,
    api_key_or_token: String,
}

impl GoogleVisionOcr {
    pub fn new(http: reqwest::Client, api_key_or_token: String) -> Self {
        Self {
            http,
            api_key_or_token,
        }
    }
}

#[async_trait::async_trait]
impl OcrBackend for GoogleVisionOcr {
    async fn extract(&self, image_bytes: &[u8]) -> CoreResult<OcrResult> {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, image_bytes);

        let body = serde_json::json!({
            "requests": [{
                "image": { "content": encoded },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
            }]
        });

        let url = format!(
            "https://vision.googleapis.com/v1/images:annotate?key={}",
            self.api_key_or_token
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Vision request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "Vision API returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("Vision response invalid: {e}")))?;

        let text = payload["responses"][0]["fullTextAnnotation"]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let mut metadata = serde_json::Map::new();
        metadata.insert("provider".into(), "google_vision".into());

        Ok(OcrResult {
            text,
            // Vision doesn't surface one aggregate score through this
            // endpoint; the original defaults to a fixed high confidence
            // when no per-word average is available.
            confidence: 0.8,
            blocks: vec![],
            language: None,
            metadata,
        })
    }
}

/// Shells out to `pdftoppm` (poppler-utils) to rasterize each page of a
/// PDF to a PNG, matching the original's use of `pdf2image` (itself a
/// poppler wrapper) rather than a pure-Rust PDF renderer.
pub async fn rasterize_pdf(pdf_bytes: &[u8]) -> CoreResult<Vec<Vec<u8>>> {
    let dir = tempfile::tempdir()
        .map_err(|e| CoreError::OcrUnavailable(format!("failed to create temp dir: {e}")))?;
    let pdf_path = dir.path().join("input.pdf");
    tokio::fs::write(&pdf_path, pdf_bytes)
        .await
        .map_err(|e| CoreError::OcrUnavailable(format!("failed to write pdf: {e}")))?;

    let prefix = dir.path().join("page");
    let status = Command::new("pdftoppm")
        .arg("-png")
        .arg(&pdf_path)
        .arg(&prefix)
        .status()
        .await
        .map_err(|e| CoreError::OcrUnavailable(format!("failed to spawn pdftoppm: {e}")))?;

    if !status.success() {
        return Err(CoreError::OcrUnavailable(format!(
            "pdftoppm exited with {status}"
        )));
    }

    let mut entries = tokio::fs::read_dir(dir.path())
        .await
        .map_err(|e| CoreError::OcrUnavailable(format!("failed to list rasterized pages: {e}")))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CoreError::OcrUnavailable(format!("failed to read dir entry: {e}")))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("png") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CoreError::OcrUnavailable(format!("failed to read rasterized page: {e}")))?;
        pages.push(bytes);
    }
    Ok(pages)
}

/// Router configuration: threshold and premium availability/credentials.
#[derive(Debug, Clone)]
pub struct OcrRouterConfig {
    pub ocr_confidence_threshold: f32,
    pub premium_enabled: bool,
}

/// C1: selects between the local and premium backends per §4.1's algorithm.
pub struct OcrRouter {
    local: Box<dyn OcrBackend>,
    premium: Option<Box<dyn OcrBackend>>,
    config: OcrRouterConfig,
}

impl OcrRouter {
    pub fn new(
        local: Box<dyn OcrBackend>,
        premium: Option<Box<dyn OcrBackend>>,
        config: OcrRouterConfig,
    ) -> Self {
        Self {
            local,
            premium,
            config,
        }
    }

    /// Extract text from a single image, routing between backends.
    pub async fn extract(&self, image_bytes: &[u8], prefer_free: bool) -> CoreResult<OcrResult> {
        if !prefer_free {
            if let Some(premium) = &self.premium {
                if self.config.premium_enabled {
                    return premium.extract(image_bytes).await;
                }
            }
            return self.local.extract(image_bytes).await;
        }

        match self.local.extract(image_bytes).await {
            Ok(result) if result.confidence >= self.config.ocr_confidence_threshold => Ok(result),
            Ok(local_result) => {
                if self.config.premium_enabled {
                    if let Some(premium) = &self.premium {
                        return premium.extract(image_bytes).await;
                    }
                }
                Ok(local_result)
            }
            Err(local_err) => {
                if self.config.premium_enabled {
                    if let Some(premium) = &self.premium {
                        return premium.extract(image_bytes).await;
                    }
                }
                Err(local_err)
            }
        }
    }

    /// OCR every page of a PDF, tagging each result's blocks with its page
    /// index.
    pub async fn extract_pdf(&self, pdf_bytes: &[u8], prefer_free: bool) -> CoreResult<Vec<OcrResult>> {
        let pages = rasterize_pdf(pdf_bytes).await?;
        let mut results = Vec::with_capacity(pages.len());
        for (index, page_bytes) in pages.into_iter().enumerate() {
            let mut result = self.extract(&page_bytes, prefer_free).await?;
            for block in &mut result.blocks {
                block.page = Some((index + 1) as u32);
            }
            results.push(result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend(f32);

    #[async_trait::async_trait]
    impl OcrBackend for FixedBackend {
        async fn extract(&self, _image_bytes: &[u8]) -> CoreResult<OcrResult> {
            Ok(OcrResult {
                text: "hello".into(),
                confidence: self.0,
                ..Default::default()
            })
        }
    }

    struct FailingBackend;

    #[async_trait::async_trait]
    impl OcrBackend for FailingBackend {
        async fn extract(&self, _image_bytes: &[u8]) -> CoreResult<OcrResult> {
            Err(CoreError::OcrUnavailable("boom".into()))
        }
    }

    fn config(premium_enabled: bool) -> OcrRouterConfig {
        OcrRouterConfig {
            ocr_confidence_threshold: 0.75,
            premium_enabled,
        }
    }

    #[tokio::test]
    async fn high_confidence_local_result_is_returned_without_premium() {
        let router = OcrRouter::new(Box::new(FixedBackend(0.9)), None, config(false));
        let result = router.extract(b"img", true).await.unwrap();
        assert_eq!(result.confidence, 0.9);
    }

    #[tokio::test]
    async fn low_confidence_falls_through_to_premium_when_enabled() {
        let router = OcrRouter::new(
            Box::new(FixedBackend(0.4)),
            Some(Box::new(FixedBackend(0.95))),
            config(true),
        );
        let result = router.extract(b"img", true).await.unwrap();
        assert_eq!(result.confidence, 0.95);
    }

    #[tokio::test]
    async fn low_confidence_without_premium_returns_local_regardless() {
        let router = OcrRouter::new(Box::new(FixedBackend(0.2)), None, config(false));
        let result = router.extract(b"img", true).await.unwrap();
        assert_eq!(result.confidence, 0.2);
    }

    #[tokio::test]
    async fn local_failure_with_premium_available_skips_to_premium() {
        let router = OcrRouter::new(
            Box::new(FailingBackend),
            Some(Box::new(FixedBackend(0.99))),
            config(true),
        );
        let result = router.extract(b"img", true).await.unwrap();
        assert_eq!(result.confidence, 0.99);
    }

    #[tokio::test]
    async fn both_failing_propagates_ocr_unavailable() {
        let router = OcrRouter::new(Box::new(FailingBackend), None, config(false));
        let err = router.extract(b"img", true).await.unwrap_err();
        assert!(matches!(err, CoreError::OcrUnavailable(_)));
    }
}

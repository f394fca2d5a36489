//! Deterministic and LLM-backed calendar event extraction, OCR routing,
//! and merge/validation (C1-C4).

pub mod deterministic;
pub mod llm;
pub mod merger;
pub mod ocr;

pub use deterministic::ExtractionContext;
pub use llm::{LlmConfig, LlmExtractor};
pub use merger::{merge_and_validate, MergedEvent};
pub use ocr::{GoogleVisionOcr, OcrBackend, OcrBlock, OcrResult, OcrRouter, OcrRouterConfig, TesseractOcr};

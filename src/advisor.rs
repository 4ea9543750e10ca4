//! Finance question answering and document analysis

use crate::error::{Result, ServiceError};
use crate::fetch::BlobFetcher;
use crate::generate::{Attachment, ContentGenerator};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use url::Url;

const DEFAULT_DOCUMENT_TYPE: &str = "application/pdf";

const TUTOR_INSTRUCTION: &str = "You are a financial markets tutor and adviser. \
Answer briefly and to the point, using real life examples. \
Cover investing, financial instruments and documents, and accounting concepts; \
explain strategies and risk management only when asked.";

const ANALYST_INSTRUCTION: &str = "You are an expert accountant. \
Summarize the attached document and list every important number it contains.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub source_url: String,
    pub response: String,
}

/// Forwards questions and documents to a content generator
pub struct Advisor {
    generator: Arc<dyn ContentGenerator>,
    fetcher: Arc<dyn BlobFetcher>,
}

impl Advisor {
    pub fn new(generator: Arc<dyn ContentGenerator>, fetcher: Arc<dyn BlobFetcher>) -> Self {
        Self { generator, fetcher }
    }

    /// Answer a finance question
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::validation("question", "must not be empty"));
        }

        info!(chars = question.len(), "answering question");
        let prompt = format!("{}\n\nThe user question: {}", TUTOR_INSTRUCTION, question);
        let answer = self.generator.generate(&prompt, &[]).await?;
        Ok(Answer { answer })
    }

    /// Summarize the document at `url` and extract its key figures
    pub async fn analyze_document(&self, url: &str) -> Result<Analysis> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| ServiceError::validation("url", format!("'{}' is not a URL: {}", url, e)))?;

        let blob = self.fetcher.fetch(&parsed).await?;
        info!(url = %parsed, bytes = blob.bytes.len(), "analyzing document");

        let attachment = Attachment {
            mime_type: blob
                .content_type
                .as_deref()
                .and_then(|ct| ct.split(';').next())
                .map(str::trim)
                .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
                .unwrap_or(DEFAULT_DOCUMENT_TYPE)
                .to_string(),
            data: blob.bytes,
        };

        let prompt = format!("{}\n\nSource: {}", ANALYST_INSTRUCTION, parsed);
        let response = self.generator.generate(&prompt, &[attachment]).await?;
        Ok(Analysis {
            source_url: parsed.to_string(),
            response,
        })
    }
}

//! Remote extraction: raw document bytes in, [`ExtractedData`] out.
//!
//! [`ExtractionBackend`] is the seam the orchestrator drives. Every way a
//! call can go wrong collapses into one [`ExtractionFailure`]; the cause is
//! kept as text for logs only.

use crate::config::GeminiConfig;
use crate::gemini::{GeminiClient, Part};
use crate::schema::{response_schema, ExtractedData};
use anyhow::Result;
use tracing::info;

const EXTRACTION_PROMPT: &str = r#"Analyze this financial document (receipt, invoice, bank statement, etc.).
Extract the following fields:
- date: transaction date in YYYY-MM-DD format
- amount: total amount as a number
- currency: ISO currency code (USD, EUR, ...)
- description: brief summary of the items or service
- vendorName: merchant or sender
- invoiceNumber: invoice number if applicable, otherwise "N/A"
- category: one of Expense, Deposit, Transfer, Charge, Other
- confidenceScore: 0-100, based on legibility and clarity of the document

If a field is missing or illegible, make a reasonable guess or use a default
(today's date if the date is illegible, 0 if the amount is unclear)."#;

/// The remote call did not produce a valid, schema-conforming result.
#[derive(Debug, thiserror::Error)]
#[error("extraction failed: {cause}")]
pub struct ExtractionFailure {
    cause: String,
}

impl ExtractionFailure {
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self {
            cause: cause.to_string(),
        }
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }
}

impl From<anyhow::Error> for ExtractionFailure {
    fn from(err: anyhow::Error) -> Self {
        Self {
            cause: format!("{:#}", err),
        }
    }
}

/// A stateless extraction service. One call is one attempt.
#[async_trait::async_trait]
pub trait ExtractionBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, data: &[u8], media_type: &str) -> Result<ExtractedData, ExtractionFailure>;
}

/// Extraction through Gemini structured output.
pub struct GeminiExtractor {
    client: GeminiClient,
}

impl GeminiExtractor {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        Ok(Self::new(GeminiClient::new(config)?))
    }
}

#[async_trait::async_trait]
impl ExtractionBackend for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(&self, data: &[u8], media_type: &str) -> Result<ExtractedData, ExtractionFailure> {
        if data.is_empty() {
            return Err(ExtractionFailure::new("empty document"));
        }
        info!(
            "Extracting {} bytes ({}) with {}",
            data.len(),
            media_type,
            self.client.model()
        );

        let parts = vec![Part::inline(media_type, data), Part::text(EXTRACTION_PROMPT)];
        let extracted: ExtractedData = self.client.generate_json(parts, response_schema()).await?;
        Ok(extracted)
    }
}

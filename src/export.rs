//! CSV export of successful extractions.

use crate::registry::DocumentEntry;
use anyhow::{Context, Result};

pub const EXPORT_FILE_NAME: &str = "extracted_financial_data.csv";

pub const HEADERS: [&str; 8] = [
    "Date",
    "Vendor",
    "Invoice #",
    "Description",
    "Category",
    "Amount",
    "Currency",
    "Confidence",
];

/// True when at least one entry would produce a row.
pub fn has_rows(entries: &[DocumentEntry]) -> bool {
    entries.iter().any(|e| e.extracted_data().is_some())
}

/// Render one row per successful entry, in the given order.
///
/// Fields containing the delimiter, a quote or a line break are quoted, with
/// inner quotes doubled.
pub fn to_csv(entries: &[DocumentEntry]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(HEADERS).context("Failed to write CSV header")?;

    for data in entries.iter().filter_map(DocumentEntry::extracted_data) {
        let amount = data.amount.to_string();
        let confidence = data.confidence_score.to_string();
        writer
            .write_record([
                data.transaction_date.as_str(),
                data.vendor_name.as_str(),
                data.invoice_number.as_str(),
                data.description.as_str(),
                data.category.as_str(),
                amount.as_str(),
                data.currency_code.as_str(),
                confidence.as_str(),
            ])
            .context("Failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

//! Extracted financial record types and the response schema sent to the model.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Sentinel used when a document carries no invoice number.
pub const NOT_APPLICABLE: &str = "N/A";

/// Closed set of transaction categories the model may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    Expense,
    Deposit,
    Transfer,
    Charge,
    Other,
}

impl TransactionCategory {
    /// Every category, in dashboard display order.
    pub const ALL: [TransactionCategory; 5] = [
        Self::Expense,
        Self::Deposit,
        Self::Transfer,
        Self::Charge,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "Expense",
            Self::Deposit => "Deposit",
            Self::Transfer => "Transfer",
            Self::Charge => "Charge",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result for one document.
///
/// Field names match the wire schema (`date`, `vendorName`, ...). Fields the
/// schema leaves optional are default-filled so the record is always complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    #[serde(rename = "date")]
    pub transaction_date: String,
    pub amount: f64,
    #[serde(rename = "currency", default)]
    pub currency_code: String,
    pub description: String,
    pub vendor_name: String,
    #[serde(default = "not_applicable")]
    pub invoice_number: String,
    pub category: TransactionCategory,
    #[serde(default)]
    pub confidence_score: f64,
}

fn not_applicable() -> String {
    NOT_APPLICABLE.to_string()
}

impl ExtractedData {
    /// Amount as shown in the results table, e.g. `USD 42.50`.
    pub fn amount_label(&self) -> String {
        if self.currency_code.is_empty() {
            format!("{:.2}", self.amount)
        } else {
            format!("{} {:.2}", self.currency_code, self.amount)
        }
    }
}

/// Fields the model must always return.
pub const REQUIRED_FIELDS: [&str; 5] = ["date", "amount", "description", "vendorName", "category"];

/// Response schema in the Gemini `responseSchema` dialect.
pub fn response_schema() -> serde_json::Value {
    let categories: Vec<&str> = TransactionCategory::ALL.iter().map(|c| c.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "date": { "type": "STRING" },
            "amount": { "type": "NUMBER" },
            "currency": { "type": "STRING" },
            "description": { "type": "STRING" },
            "vendorName": { "type": "STRING" },
            "invoiceNumber": { "type": "STRING" },
            "category": { "type": "STRING", "enum": categories },
            "confidenceScore": { "type": "NUMBER" }
        },
        "required": REQUIRED_FIELDS,
    })
}

//! Summary statistics derived from a registry snapshot.
//!
//! Pure functions over `&[DocumentEntry]`; recomputed on demand, never
//! stored. Amounts are summed across currencies without conversion.

use crate::registry::DocumentEntry;
use crate::schema::TransactionCategory;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub name: TransactionCategory,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_successful: usize,
    pub total_amount: f64,
    /// Successful entries per category, in display order; zero counts omitted.
    pub category_breakdown: Vec<CategoryCount>,
}

pub fn aggregate(entries: &[DocumentEntry]) -> AggregateStats {
    let mut counts = vec![0usize; TransactionCategory::ALL.len()];
    let mut total_successful = 0;
    let mut total_amount = 0.0;

    for data in entries.iter().filter_map(DocumentEntry::extracted_data) {
        total_successful += 1;
        total_amount += data.amount;
        if let Some(slot) = TransactionCategory::ALL.iter().position(|c| *c == data.category) {
            counts[slot] += 1;
        }
    }

    let category_breakdown = TransactionCategory::ALL
        .iter()
        .zip(counts)
        .filter(|(_, value)| *value > 0)
        .map(|(name, value)| CategoryCount { name: *name, value })
        .collect();

    AggregateStats {
        total_successful,
        total_amount,
        category_breakdown,
    }
}

/// Dashboard view: the aggregate plus presentation-only fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub stats: AggregateStats,
    pub total_documents: usize,
    pub processed_percent: f64,
    pub total_amount_label: String,
}

pub fn dashboard(entries: &[DocumentEntry]) -> DashboardStats {
    let stats = aggregate(entries);
    let total_documents = entries.len();
    let processed_percent =
        (stats.total_successful as f64 / total_documents.max(1) as f64 * 100.0).min(100.0);
    let total_amount_label = format_amount(stats.total_amount);

    DashboardStats {
        stats,
        total_documents,
        processed_percent,
        total_amount_label,
    }
}

/// Two decimals with comma thousands separators, e.g. `1,234.50`.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && !fixed.trim_matches(|c: char| c == '0' || c == '.').is_empty() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

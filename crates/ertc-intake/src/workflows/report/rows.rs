use serde::Serialize;
use serde_json::Value;

use crate::workflows::intake::RevenueYears;
use crate::workflows::qualification::format::{format_currency, format_percent, yes_no};
use crate::workflows::qualification::{QualificationSummary, QuarterAnalysisResult};

/// One spreadsheet row of the qualification table, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRow {
    pub quarter: &'static str,
    pub baseline_revenue: String,
    pub comparison_revenue: String,
    pub change: String,
    pub percent_decrease: String,
    pub qualifies: &'static str,
    /// Renderers that support styling emphasize qualifying rows.
    pub highlight: bool,
}

impl AnalysisRow {
    pub fn from_result(result: &QuarterAnalysisResult) -> Self {
        Self {
            quarter: result.label(),
            baseline_revenue: format_currency(result.baseline_revenue),
            comparison_revenue: format_currency(result.comparison_revenue),
            change: format_currency(result.change),
            percent_decrease: format_percent(result.percent_decrease),
            qualifies: yes_no(result.qualifies),
            highlight: result.qualifies,
        }
    }

    pub fn cells(&self) -> [&str; 6] {
        [
            self.quarter,
            &self.baseline_revenue,
            &self.comparison_revenue,
            &self.change,
            &self.percent_decrease,
            self.qualifies,
        ]
    }
}

pub fn analysis_header(years: RevenueYears) -> [String; 6] {
    [
        "Quarter".to_string(),
        format!("{} Revenue", years.baseline),
        format!("{} Revenue", years.comparison),
        "Change".to_string(),
        "Percent Decrease".to_string(),
        "Qualifies".to_string(),
    ]
}

/// Rows in quarter order; positional consumers rely on it.
pub fn analysis_rows(summary: &QualificationSummary) -> Vec<AnalysisRow> {
    summary.results().iter().map(AnalysisRow::from_result).collect()
}

pub fn summary_line(summary: &QualificationSummary) -> String {
    if summary.any_qualifying() {
        format!(
            "Qualifying quarters: {}",
            summary.qualifying_quarters().join(", ")
        )
    } else {
        "No quarters qualify for the revenue reduction test".to_string()
    }
}

/// Flattens a form payload into `(path, text)` pairs for the data sheet.
pub fn flatten_payload(payload: &Value) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    match payload {
        Value::Object(map) if map.is_empty() => {}
        Value::Array(items) if items.is_empty() => {}
        Value::Object(_) | Value::Array(_) => flatten_into(payload, String::new(), &mut entries),
        other => entries.push(("payload".to_string(), scalar_text(other))),
    }
    entries
}

fn flatten_into(value: &Value, prefix: String, entries: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, join(key), entries);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, join(&index.to_string()), entries);
            }
        }
        Value::Object(_) | Value::Array(_) => entries.push((prefix, String::new())),
        scalar => entries.push((prefix, scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

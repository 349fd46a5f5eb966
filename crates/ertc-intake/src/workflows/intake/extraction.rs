//! Typed mapping from webhook form fields to quarterly revenue inputs.
//!
//! Form builders nest answers differently, so the analyzer never reads the
//! payload directly. A versioned [`ExtractionContract`] names the field path
//! for every quarter and year; only those paths are probed.

use std::fmt;

use serde_json::Value;

use crate::workflows::qualification::{Quarter, RevenueByQuarter};

/// Current revision of the field layout expected from intake forms.
pub const CURRENT_CONTRACT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("form payload must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Dotted path into nested JSON objects, e.g. `revenue.2019.q1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(dotted: &str) -> Self {
        let segments = dotted
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        if self.segments.is_empty() {
            return None;
        }

        self.segments
            .iter()
            .try_fold(root, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Where one quarter's revenue for one year lives in the payload.
#[derive(Debug, Clone)]
pub struct QuarterField {
    pub quarter: Quarter,
    pub path: FieldPath,
    /// Flat key probed at the payload root when the nested path is absent.
    pub fallback_key: String,
}

impl QuarterField {
    fn locate<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        self.path
            .resolve(payload)
            .or_else(|| payload.get(self.fallback_key.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueYears {
    pub baseline: u16,
    pub comparison: u16,
}

#[derive(Debug, Clone)]
pub struct ExtractionContract {
    pub version: u32,
    pub years: RevenueYears,
    pub baseline: Vec<QuarterField>,
    pub comparison: Vec<QuarterField>,
}

/// Analyzer inputs pulled out of a payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedRevenue {
    pub baseline: RevenueByQuarter,
    pub comparison: RevenueByQuarter,
}

impl ExtractionContract {
    /// 2019 against 2021, nested under `revenue.<year>.q<n>` or flat as `q<n>_<year>`.
    pub fn v1() -> Self {
        let years = RevenueYears {
            baseline: 2019,
            comparison: 2021,
        };

        Self {
            version: CURRENT_CONTRACT_VERSION,
            years,
            baseline: Self::year_fields(years.baseline),
            comparison: Self::year_fields(years.comparison),
        }
    }

    fn year_fields(year: u16) -> Vec<QuarterField> {
        Quarter::ordered()
            .into_iter()
            .map(|quarter| QuarterField {
                quarter,
                path: FieldPath::parse(&format!("revenue.{year}.{}", quarter.key())),
                fallback_key: format!("{}_{year}", quarter.key()),
            })
            .collect()
    }

    /// Pulls both revenue maps. Absent fields are left out; the analyzer
    /// reads them as zero. Only a non-object payload is rejected.
    pub fn extract(&self, payload: &Value) -> Result<ExtractedRevenue, ExtractionError> {
        if !payload.is_object() {
            return Err(ExtractionError::NotAnObject(json_kind(payload)));
        }

        Ok(ExtractedRevenue {
            baseline: collect_year(&self.baseline, payload),
            comparison: collect_year(&self.comparison, payload),
        })
    }
}

impl Default for ExtractionContract {
    fn default() -> Self {
        Self::v1()
    }
}

fn collect_year(fields: &[QuarterField], payload: &Value) -> RevenueByQuarter {
    let mut revenue = RevenueByQuarter::new();
    for field in fields {
        if let Some(value) = field.locate(payload) {
            revenue.insert_value(field.quarter, value);
        }
    }
    revenue
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

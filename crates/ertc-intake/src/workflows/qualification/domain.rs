use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three quarters covered by the revenue reduction test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quarter {
    First,
    Second,
    Third,
}

impl Quarter {
    pub const fn ordered() -> [Quarter; 3] {
        [Self::First, Self::Second, Self::Third]
    }

    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "Quarter 1",
            Self::Second => "Quarter 2",
            Self::Third => "Quarter 3",
        }
    }

    /// Short key used by revenue maps and form fields (`q1`, `q2`, `q3`).
    pub const fn key(self) -> &'static str {
        match self {
            Self::First => "q1",
            Self::Second => "q2",
            Self::Third => "q3",
        }
    }

    /// Accepts `q1`, `Q1`, `1`, `quarter_1` and `Quarter 1` style identifiers.
    pub fn from_key(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "q1" | "1" | "quarter1" => Some(Self::First),
            "q2" | "2" | "quarter2" => Some(Self::Second),
            "q3" | "3" | "quarter3" => Some(Self::Third),
            _ => None,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Quarter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Quarter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Quarter::from_key(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown quarter identifier '{raw}'")))
    }
}

/// Normalizes a loosely typed revenue value to a finite amount.
///
/// Numbers pass through, numeric strings are parsed after trimming, and
/// everything else (null, booleans, blanks, `NaN`, garbage) becomes `0`.
pub fn parse_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|amount| amount.is_finite()).unwrap_or(0.0)
}

/// Revenue figures for one year keyed by quarter. Missing quarters read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevenueByQuarter {
    amounts: BTreeMap<Quarter, f64>,
}

impl RevenueByQuarter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, quarter: Quarter, amount: f64) -> Self {
        self.insert(quarter, amount);
        self
    }

    pub fn insert(&mut self, quarter: Quarter, amount: f64) {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        self.amounts.insert(quarter, amount);
    }

    pub fn insert_value(&mut self, quarter: Quarter, value: &Value) {
        self.insert(quarter, parse_amount(value));
    }

    pub fn amount(&self, quarter: Quarter) -> f64 {
        self.amounts.get(&quarter).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, quarter: Quarter) -> bool {
        self.amounts.contains_key(&quarter)
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

impl Serialize for RevenueByQuarter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.amounts.len()))?;
        for (quarter, amount) in &self.amounts {
            map.serialize_entry(quarter.key(), amount)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RevenueByQuarter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut revenue = RevenueByQuarter::new();
        for (key, value) in &raw {
            if let Some(quarter) = Quarter::from_key(key) {
                revenue.insert_value(quarter, value);
            }
        }
        Ok(revenue)
    }
}

/// Baseline and comparison revenue for a single quarter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarterRevenuePair {
    pub quarter: Quarter,
    pub baseline: f64,
    pub comparison: f64,
}

impl QuarterRevenuePair {
    pub fn from_maps(
        quarter: Quarter,
        baseline: &RevenueByQuarter,
        comparison: &RevenueByQuarter,
    ) -> Self {
        Self {
            quarter,
            baseline: baseline.amount(quarter),
            comparison: comparison.amount(quarter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterAnalysisResult {
    pub quarter: Quarter,
    pub baseline_revenue: f64,
    pub comparison_revenue: f64,
    /// Baseline minus comparison; negative when revenue grew.
    pub change: f64,
    /// Rounded to two decimals; `0` when the baseline is not positive.
    pub percent_decrease: f64,
    pub qualifies: bool,
}

impl QuarterAnalysisResult {
    pub fn label(&self) -> &'static str {
        self.quarter.label()
    }

    pub fn percent_display(&self) -> String {
        super::format::format_percent(self.percent_decrease)
    }
}

/// Per-quarter results in quarter order plus the labels of qualifying quarters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSummary")]
pub struct QualificationSummary {
    results: Vec<QuarterAnalysisResult>,
    qualifying_quarters: Vec<String>,
}

impl QualificationSummary {
    pub(crate) fn from_results(results: Vec<QuarterAnalysisResult>) -> Self {
        let qualifying_quarters = results
            .iter()
            .filter(|result| result.qualifies)
            .map(|result| result.label().to_string())
            .collect();

        Self {
            results,
            qualifying_quarters,
        }
    }

    pub fn results(&self) -> &[QuarterAnalysisResult] {
        &self.results
    }

    pub fn qualifying_quarters(&self) -> &[String] {
        &self.qualifying_quarters
    }

    pub fn result(&self, quarter: Quarter) -> Option<&QuarterAnalysisResult> {
        self.results.iter().find(|result| result.quarter == quarter)
    }

    pub fn any_qualifying(&self) -> bool {
        !self.qualifying_quarters.is_empty()
    }
}

// Stored records only need the per-quarter results; the qualifying list is
// always rebuilt from them on load.
#[derive(Deserialize)]
struct StoredSummary {
    results: Vec<QuarterAnalysisResult>,
}

impl From<StoredSummary> for QualificationSummary {
    fn from(value: StoredSummary) -> Self {
        Self::from_results(value.results)
    }
}

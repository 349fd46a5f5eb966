//! Revenue reduction test over the first three quarters of the year.
//!
//! A quarter qualifies when comparison-year revenue fell at least 50% below
//! the baseline year. The analysis is a pure function; report rendering and
//! persistence consume the resulting [`QualificationSummary`].

mod analyzer;
mod domain;
pub mod format;

pub use analyzer::{analyze, analyze_quarter, QUALIFYING_DECREASE_PCT};
pub use domain::{
    parse_amount, QualificationSummary, Quarter, QuarterAnalysisResult, QuarterRevenuePair,
    RevenueByQuarter,
};

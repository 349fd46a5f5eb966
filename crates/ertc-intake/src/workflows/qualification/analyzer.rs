use super::domain::{
    QualificationSummary, Quarter, QuarterAnalysisResult, QuarterRevenuePair, RevenueByQuarter,
};

/// Inclusive percent-decrease threshold a quarter must reach to qualify.
pub const QUALIFYING_DECREASE_PCT: f64 = 50.0;

/// Runs the revenue reduction test over quarters 1-3.
///
/// Total over its inputs: missing quarters count as zero and there is no
/// failure path, so callers can always render a report from the result.
pub fn analyze(baseline: &RevenueByQuarter, comparison: &RevenueByQuarter) -> QualificationSummary {
    let results = Quarter::ordered()
        .into_iter()
        .map(|quarter| QuarterRevenuePair::from_maps(quarter, baseline, comparison))
        .map(|pair| analyze_quarter(&pair))
        .collect();

    QualificationSummary::from_results(results)
}

pub fn analyze_quarter(pair: &QuarterRevenuePair) -> QuarterAnalysisResult {
    let change = pair.baseline - pair.comparison;

    let percent_decrease = if pair.baseline > 0.0 {
        round_for_display(change / pair.baseline * 100.0)
    } else {
        0.0
    };

    // The verdict reads the rounded figure so it always agrees with the
    // percentage printed next to it (49.996 shows as 50.00 and qualifies).
    let qualifies = pair.baseline > 0.0 && percent_decrease >= QUALIFYING_DECREASE_PCT;

    QuarterAnalysisResult {
        quarter: pair.quarter,
        baseline_revenue: pair.baseline,
        comparison_revenue: pair.comparison,
        change,
        percent_decrease,
        qualifies,
    }
}

/// Rounds through the two-decimal text form, the same representation reports print.
pub(crate) fn round_for_display(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    let rounded = format!("{value:.2}").parse::<f64>().unwrap_or(0.0);
    if rounded == 0.0 {
        // drop the sign of -0.00
        0.0
    } else {
        rounded
    }
}

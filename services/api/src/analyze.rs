use crate::infra::parse_revenue;
use clap::Args;
use ertc_intake::error::AppError;
use ertc_intake::workflows::intake::{ExtractionContract, RevenueYears};
use ertc_intake::workflows::qualification::{analyze, QualificationSummary, RevenueByQuarter};
use ertc_intake::workflows::report::{analysis_header, analysis_rows, summary_line};

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Baseline-year revenue, e.g. "q1=10000,q2=5000,q3=8000"
    #[arg(long, value_parser = parse_revenue)]
    pub(crate) baseline: Option<RevenueByQuarter>,
    /// Comparison-year revenue, same format as --baseline
    #[arg(long, value_parser = parse_revenue)]
    pub(crate) comparison: Option<RevenueByQuarter>,
    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        baseline,
        comparison,
        json,
    } = args;

    let summary = analyze(
        &baseline.unwrap_or_default(),
        &comparison.unwrap_or_default(),
    );
    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Summary unavailable as JSON: {err}"),
        }
    } else {
        print!("{}", render_table(&summary, ExtractionContract::v1().years));
    }

    Ok(())
}

fn render_table(summary: &QualificationSummary, years: RevenueYears) -> String {
    let header = analysis_header(years);
    let rows = analysis_rows(summary);

    let mut widths = header.each_ref().map(String::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::from("Revenue qualification analysis\n");
    out.push_str(&format_line(header.each_ref().map(String::as_str), &widths, ' '));
    for row in &rows {
        let marker = if row.highlight { '*' } else { ' ' };
        out.push_str(&format_line(row.cells(), &widths, marker));
    }
    out.push('\n');
    out.push_str(&summary_line(summary));
    out.push('\n');
    out
}

fn format_line(cells: [&str; 6], widths: &[usize; 6], marker: char) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    format!("{marker} {}\n", padded.join("  ").trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> QualificationSummary {
        analyze(
            &parse_revenue("q1=10000,q2=5000,q3=8000").expect("baseline"),
            &parse_revenue("q1=4000,q2=5000,q3=0").expect("comparison"),
        )
    }

    #[test]
    fn table_marks_qualifying_quarters() {
        let table = render_table(&summary(), ExtractionContract::v1().years);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Revenue qualification analysis");
        assert!(lines[1].contains("2019 Revenue"));
        assert!(lines[1].contains("2021 Revenue"));
        assert!(lines[2].starts_with("* Quarter 1"));
        assert!(lines[2].contains("60.00%"));
        assert!(lines[3].starts_with("  Quarter 2"));
        assert!(lines[4].starts_with("* Quarter 3"));
        assert!(lines[4].ends_with("Yes"));
        assert_eq!(
            lines.last().copied(),
            Some("Qualifying quarters: Quarter 1, Quarter 3")
        );
    }

    #[test]
    fn empty_input_reports_no_qualifying_quarters() {
        let summary = analyze(&RevenueByQuarter::new(), &RevenueByQuarter::new());
        let table = render_table(&summary, ExtractionContract::v1().years);

        assert_eq!(table.lines().filter(|line| line.contains("No")).count(), 4);
        assert!(table.ends_with("No quarters qualify for the revenue reduction test\n"));
    }
}

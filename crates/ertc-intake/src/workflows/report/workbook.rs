use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::rows::{analysis_header, analysis_rows, flatten_payload, summary_line};
use crate::workflows::intake::RevenueYears;
use crate::workflows::qualification::QualificationSummary;

pub const REPORT_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush report buffer: {0}")]
    Buffer(String),
}

/// Identifying details printed at the top of a report.
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    pub submission_id: &'a str,
    pub form_id: Option<&'a str>,
    pub received_at: DateTime<Utc>,
}

pub fn report_file_name(submission_id: &str) -> String {
    format!("report-{submission_id}.csv")
}

/// Renders the submission data sheet followed by the qualification table.
pub fn render_csv(
    header: &ReportHeader<'_>,
    payload: &Value,
    summary: &QualificationSummary,
    years: RevenueYears,
) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(["Submission Report"])?;
    writer.write_record(["Submission ID", header.submission_id])?;
    writer.write_record(["Form ID", header.form_id.unwrap_or("")])?;
    writer.write_record([
        "Received At".to_string(),
        header.received_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    ])?;
    writer.write_record([""])?;

    writer.write_record(["Submission Data"])?;
    writer.write_record(["Field", "Value"])?;
    for (field, value) in flatten_payload(payload) {
        writer.write_record([field, value])?;
    }
    writer.write_record([""])?;

    writer.write_record(["Revenue Qualification Analysis"])?;
    writer.write_record(analysis_header(years))?;
    for row in analysis_rows(summary) {
        writer.write_record(row.cells())?;
    }
    writer.write_record([""])?;
    writer.write_record([summary_line(summary)])?;

    writer
        .into_inner()
        .map_err(|err| ReportError::Buffer(err.to_string()))
}

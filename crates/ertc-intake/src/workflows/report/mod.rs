//! Spreadsheet report built from a submission and its qualification analysis.

pub mod rows;
mod workbook;

pub use rows::{analysis_header, analysis_rows, summary_line, AnalysisRow};
pub use workbook::{render_csv, report_file_name, ReportError, ReportHeader, REPORT_CONTENT_TYPE};

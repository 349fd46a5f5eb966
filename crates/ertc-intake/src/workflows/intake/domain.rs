use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::qualification::{QualificationSummary, QuarterAnalysisResult};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub String);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Upload,
    Report,
}

/// Metadata kept on the submission record for every stored binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub id: AttachmentId,
    pub kind: AttachmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub stored_at: DateTime<Utc>,
}

/// A binary on its way into the attachment store.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub kind: AttachmentKind,
    pub field_name: Option<String>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl NewAttachment {
    pub fn upload(
        field_name: Option<String>,
        file_name: &str,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            kind: AttachmentKind::Upload,
            field_name,
            file_name: sanitize_file_name(file_name),
            content_type,
            bytes,
        }
    }

    /// Stored content type: the declared one, else a guess from the file name.
    pub fn resolved_content_type(&self) -> String {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            })
    }
}

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub meta: AttachmentMeta,
    pub bytes: Vec<u8>,
}

/// Parsed webhook delivery before it is analyzed and persisted.
#[derive(Debug, Clone)]
pub struct WebhookSubmission {
    pub form_id: Option<String>,
    pub payload: Value,
    pub files: Vec<NewAttachment>,
}

/// Persisted submission document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub received_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub contract_version: u32,
    pub payload: Value,
    pub analysis: QualificationSummary,
    #[serde(default)]
    pub attachments: Vec<AttachmentMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<AttachmentMeta>,
}

impl SubmissionRecord {
    pub fn qualifying_quarters(&self) -> &[String] {
        self.analysis.qualifying_quarters()
    }

    pub fn find_attachment(&self, id: &AttachmentId) -> Option<&AttachmentMeta> {
        self.attachments
            .iter()
            .chain(self.report.iter())
            .find(|meta| &meta.id == id)
    }

    pub fn view(&self) -> SubmissionView {
        SubmissionView {
            submission_id: self.id.clone(),
            received_at: self.received_at,
            form_id: self.form_id.clone(),
            qualifying_quarters: self.qualifying_quarters().to_vec(),
            analysis: self.analysis.results().to_vec(),
            attachments: self.attachments.clone(),
            report: self.report.clone(),
            payload: self.payload.clone(),
        }
    }

    pub fn list_entry(&self) -> SubmissionListEntry {
        SubmissionListEntry {
            submission_id: self.id.clone(),
            received_at: self.received_at,
            form_id: self.form_id.clone(),
            qualifying_quarters: self.qualifying_quarters().to_vec(),
            attachment_count: self.attachments.len(),
            has_report: self.report.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub submission_id: SubmissionId,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub qualifying_quarters: Vec<String>,
    pub analysis: Vec<QuarterAnalysisResult>,
    pub attachments: Vec<AttachmentMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AttachmentMeta>,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListEntry {
    pub submission_id: SubmissionId,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub qualifying_quarters: Vec<String>,
    pub attachment_count: usize,
    pub has_report: bool,
}

/// Reduces client-supplied names to a plain basename without control characters.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .filter(|ch| !ch.is_control() && *ch != '"')
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned.to_string()
    }
}

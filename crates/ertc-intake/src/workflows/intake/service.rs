use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{
    AttachmentId, AttachmentKind, NewAttachment, StoredAttachment, SubmissionId,
    SubmissionRecord, WebhookSubmission,
};
use super::extraction::{ExtractionContract, ExtractionError};
use super::repository::{AttachmentError, AttachmentStore, RepositoryError, SubmissionRepository};
use crate::workflows::qualification::{analyze, QualificationSummary};
use crate::workflows::report::{
    render_csv, report_file_name, ReportError, ReportHeader, REPORT_CONTENT_TYPE,
};

/// Owns the document store handles for the lifetime of the process.
pub struct IntakeService<R, A> {
    repository: Arc<R>,
    attachments: Arc<A>,
    contract: ExtractionContract,
}

impl<R, A> IntakeService<R, A>
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    pub fn new(repository: Arc<R>, attachments: Arc<A>) -> Self {
        Self::with_contract(repository, attachments, ExtractionContract::v1())
    }

    pub fn with_contract(
        repository: Arc<R>,
        attachments: Arc<A>,
        contract: ExtractionContract,
    ) -> Self {
        Self {
            repository,
            attachments,
            contract,
        }
    }

    pub fn contract(&self) -> &ExtractionContract {
        &self.contract
    }

    /// Analyzes, stores uploads and the generated report, then persists the record.
    ///
    /// Binaries written before a failure are removed again so no attachment
    /// outlives an ingest that did not produce a record.
    pub fn ingest(&self, submission: WebhookSubmission) -> Result<SubmissionRecord, IntakeError> {
        let WebhookSubmission {
            form_id,
            payload,
            files,
        } = submission;

        let revenue = self.contract.extract(&payload)?;
        let analysis = analyze(&revenue.baseline, &revenue.comparison);

        let pending = PendingSubmission {
            id: self.repository.next_id()?,
            received_at: Utc::now(),
            form_id,
            payload,
            analysis,
        };
        let id = pending.id.clone();

        let mut written = Vec::new();
        match self.persist(pending, files, &mut written) {
            Ok(stored) => {
                info!(
                    submission_id = %stored.id,
                    attachments = stored.attachments.len(),
                    qualifying_quarters = ?stored.qualifying_quarters(),
                    "submission ingested"
                );
                Ok(stored)
            }
            Err(err) => {
                self.discard(&id, &written);
                Err(err)
            }
        }
    }

    fn persist(
        &self,
        pending: PendingSubmission,
        files: Vec<NewAttachment>,
        written: &mut Vec<AttachmentId>,
    ) -> Result<SubmissionRecord, IntakeError> {
        let PendingSubmission {
            id,
            received_at,
            form_id,
            payload,
            analysis,
        } = pending;

        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            let meta = self.attachments.put(&id, file)?;
            written.push(meta.id.clone());
            attachments.push(meta);
        }

        let report_bytes = render_csv(
            &ReportHeader {
                submission_id: &id.0,
                form_id: form_id.as_deref(),
                received_at,
            },
            &payload,
            &analysis,
            self.contract.years,
        )?;
        let report = self.attachments.put(
            &id,
            NewAttachment {
                kind: AttachmentKind::Report,
                field_name: None,
                file_name: report_file_name(&id.0),
                content_type: Some(REPORT_CONTENT_TYPE.to_string()),
                bytes: report_bytes,
            },
        )?;
        written.push(report.id.clone());
        debug!(submission_id = %id, report_id = %report.id, "report stored");

        let record = SubmissionRecord {
            id,
            received_at,
            form_id,
            contract_version: self.contract.version,
            payload,
            analysis,
            attachments,
            report: Some(report),
        };

        Ok(self.repository.insert(record)?)
    }

    fn discard(&self, id: &SubmissionId, written: &[AttachmentId]) {
        for attachment_id in written {
            if let Err(err) = self.attachments.remove(id, attachment_id) {
                warn!(
                    submission_id = %id,
                    attachment_id = %attachment_id,
                    error = %err,
                    "failed to remove attachment of a rejected submission"
                );
            }
        }
        if !written.is_empty() {
            debug!(submission_id = %id, removed = written.len(), "discarded partial submission");
        }
    }

    pub fn get(&self, id: &SubmissionId) -> Result<SubmissionRecord, IntakeError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| IntakeError::NotFound(id.clone()))
    }

    pub fn list(&self, limit: usize) -> Result<Vec<SubmissionRecord>, IntakeError> {
        Ok(self.repository.list(limit)?)
    }

    pub fn report(&self, id: &SubmissionId) -> Result<StoredAttachment, IntakeError> {
        let record = self.get(id)?;
        let meta = record
            .report
            .ok_or_else(|| IntakeError::ReportMissing(id.clone()))?;
        self.attachments
            .get(id, &meta.id)?
            .ok_or_else(|| IntakeError::ReportMissing(id.clone()))
    }

    /// Only attachments listed on the record are served.
    pub fn attachment(
        &self,
        id: &SubmissionId,
        attachment_id: &AttachmentId,
    ) -> Result<StoredAttachment, IntakeError> {
        let record = self.get(id)?;
        let missing = || IntakeError::AttachmentNotFound {
            submission: id.clone(),
            attachment: attachment_id.clone(),
        };

        record.find_attachment(attachment_id).ok_or_else(missing)?;
        self.attachments.get(id, attachment_id)?.ok_or_else(missing)
    }
}

/// Analyzed submission waiting for its binaries to be stored.
struct PendingSubmission {
    id: SubmissionId,
    received_at: DateTime<Utc>,
    form_id: Option<String>,
    payload: Value,
    analysis: QualificationSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("submission {0} not found")]
    NotFound(SubmissionId),
    #[error("submission {0} has no stored report")]
    ReportMissing(SubmissionId),
    #[error("attachment {attachment} not found on submission {submission}")]
    AttachmentNotFound {
        submission: SubmissionId,
        attachment: AttachmentId,
    },
    #[error("background task failed: {0}")]
    Worker(String),
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IntakeError::NotFound(_)
            | IntakeError::ReportMissing(_)
            | IntakeError::AttachmentNotFound { .. } => StatusCode::NOT_FOUND,
            IntakeError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            IntakeError::Repository(_)
            | IntakeError::Attachment(_)
            | IntakeError::Report(_)
            | IntakeError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

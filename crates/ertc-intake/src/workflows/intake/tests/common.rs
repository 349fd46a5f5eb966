use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::{json, Value};

use crate::workflows::intake::domain::{
    AttachmentId, AttachmentMeta, NewAttachment, StoredAttachment, SubmissionId, SubmissionRecord,
    WebhookSubmission,
};
use crate::workflows::intake::repository::{
    AttachmentError, AttachmentStore, RepositoryError, SubmissionRepository,
};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::workflows::intake::{intake_router, IntakeService};

pub(super) const BOUNDARY: &str = "----ertc-test-boundary";

pub(super) fn revenue_payload() -> Value {
    json!({
        "company": "Acme Plumbing LLC",
        "contact": { "name": "Dana Ruiz", "email": "dana@acme.test" },
        "revenue": {
            "2019": { "q1": "10000", "q2": 5000, "q3": "8000" },
            "2021": { "q1": "4000", "q2": "5000", "q3": 0 }
        }
    })
}

pub(super) fn webhook_submission() -> WebhookSubmission {
    WebhookSubmission {
        form_id: Some("231".to_string()),
        payload: revenue_payload(),
        files: vec![NewAttachment::upload(
            Some("bankStatements".to_string()),
            "statements-2021.pdf",
            Some("application/pdf".to_string()),
            b"%PDF-1.7 fake".to_vec(),
        )],
    }
}

pub(super) fn build_service() -> (
    IntakeService<MemoryRepository, MemoryAttachments>,
    Arc<MemoryRepository>,
    Arc<MemoryAttachments>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let attachments = Arc::new(MemoryAttachments::default());
    let service = IntakeService::new(repository.clone(), attachments.clone());
    (service, repository, attachments)
}

pub(super) fn router_with_service(
    service: IntakeService<MemoryRepository, MemoryAttachments>,
) -> axum::Router {
    router_with_limit(service, DEFAULT_MAX_UPLOAD_BYTES)
}

pub(super) fn router_with_limit(
    service: IntakeService<MemoryRepository, MemoryAttachments>,
    max_upload_bytes: usize,
) -> axum::Router {
    intake_router(Arc::new(service), None, max_upload_bytes)
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    sequence: AtomicU64,
    pub(super) records: Mutex<BTreeMap<SubmissionId, SubmissionRecord>>,
}

impl SubmissionRepository for MemoryRepository {
    fn next_id(&self) -> Result<SubmissionId, RepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SubmissionId(format!("sub-{next:06}")))
    }

    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().rev().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryAttachments {
    sequence: AtomicU64,
    blobs: Mutex<Vec<(SubmissionId, StoredAttachment)>>,
}

impl MemoryAttachments {
    pub(super) fn count(&self) -> usize {
        self.blobs.lock().expect("attachment mutex poisoned").len()
    }
}

impl AttachmentStore for MemoryAttachments {
    fn put(
        &self,
        submission: &SubmissionId,
        attachment: NewAttachment,
    ) -> Result<AttachmentMeta, AttachmentError> {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.blobs.lock().expect("attachment mutex poisoned");
        let meta = AttachmentMeta {
            id: AttachmentId(format!("att-{next:03}")),
            kind: attachment.kind,
            content_type: attachment.resolved_content_type(),
            field_name: attachment.field_name,
            file_name: attachment.file_name,
            size: attachment.bytes.len() as u64,
            stored_at: Utc::now(),
        };
        guard.push((
            submission.clone(),
            StoredAttachment {
                meta: meta.clone(),
                bytes: attachment.bytes,
            },
        ));
        Ok(meta)
    }

    fn get(
        &self,
        submission: &SubmissionId,
        id: &AttachmentId,
    ) -> Result<Option<StoredAttachment>, AttachmentError> {
        let guard = self.blobs.lock().expect("attachment mutex poisoned");
        Ok(guard
            .iter()
            .find(|(owner, stored)| owner == submission && &stored.meta.id == id)
            .map(|(_, stored)| stored.clone()))
    }

    fn remove(&self, submission: &SubmissionId, id: &AttachmentId) -> Result<(), AttachmentError> {
        let mut guard = self.blobs.lock().expect("attachment mutex poisoned");
        guard.retain(|(owner, stored)| !(owner == submission && &stored.meta.id == id));
        Ok(())
    }
}

/// Hands out ids but refuses to store records.
#[derive(Default)]
pub(super) struct ReadOnlyRepository {
    inner: MemoryRepository,
}

impl SubmissionRepository for ReadOnlyRepository {
    fn next_id(&self) -> Result<SubmissionId, RepositoryError> {
        self.inner.next_id()
    }

    fn insert(&self, _record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("document store is read-only".to_string()))
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, limit: usize) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        self.inner.list(limit)
    }
}

pub(super) struct UnavailableRepository;

impl SubmissionRepository for UnavailableRepository {
    fn next_id(&self) -> Result<SubmissionId, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn insert(&self, _record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn list(&self, _limit: usize) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }
}

pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_request(
    uri: &str,
    parts: &[Part<'_>],
) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(
            axum::http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(axum::body::Body::from(multipart_body(parts)))
        .expect("request builds")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}

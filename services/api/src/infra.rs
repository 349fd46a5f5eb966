use chrono::Utc;
use ertc_intake::workflows::intake::{
    AttachmentError, AttachmentId, AttachmentMeta, AttachmentStore, NewAttachment,
    RepositoryError, StoredAttachment, SubmissionId, SubmissionRecord, SubmissionRepository,
};
use ertc_intake::workflows::qualification::{Quarter, RevenueByQuarter};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local submission store used when no storage directory is configured.
#[derive(Default)]
pub(crate) struct InMemorySubmissionRepository {
    sequence: AtomicU64,
    records: Mutex<Vec<SubmissionRecord>>,
}

impl InMemorySubmissionRepository {
    fn records(&self) -> Result<MutexGuard<'_, Vec<SubmissionRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl SubmissionRepository for InMemorySubmissionRepository {
    fn next_id(&self) -> Result<SubmissionId, RepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SubmissionId(format!("sub-{next:06}")))
    }

    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.records()?;
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.records()?;
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let guard = self.records()?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAttachmentStore {
    sequence: AtomicU64,
    blobs: Mutex<HashMap<SubmissionId, Vec<StoredAttachment>>>,
}

impl AttachmentStore for InMemoryAttachmentStore {
    fn put(
        &self,
        submission: &SubmissionId,
        attachment: NewAttachment,
    ) -> Result<AttachmentMeta, AttachmentError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|_| AttachmentError::Unavailable("attachment mutex poisoned".to_string()))?;
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = guard.entry(submission.clone()).or_default();
        let meta = AttachmentMeta {
            id: AttachmentId(format!("att-{next:03}")),
            kind: attachment.kind,
            content_type: attachment.resolved_content_type(),
            field_name: attachment.field_name,
            file_name: attachment.file_name,
            size: attachment.bytes.len() as u64,
            stored_at: Utc::now(),
        };
        stored.push(StoredAttachment {
            meta: meta.clone(),
            bytes: attachment.bytes,
        });
        Ok(meta)
    }

    fn get(
        &self,
        submission: &SubmissionId,
        id: &AttachmentId,
    ) -> Result<Option<StoredAttachment>, AttachmentError> {
        let guard = self
            .blobs
            .lock()
            .map_err(|_| AttachmentError::Unavailable("attachment mutex poisoned".to_string()))?;
        Ok(guard
            .get(submission)
            .and_then(|stored| stored.iter().find(|blob| &blob.meta.id == id))
            .cloned())
    }

    fn remove(&self, submission: &SubmissionId, id: &AttachmentId) -> Result<(), AttachmentError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|_| AttachmentError::Unavailable("attachment mutex poisoned".to_string()))?;
        if let Some(stored) = guard.get_mut(submission) {
            stored.retain(|blob| &blob.meta.id != id);
        }
        Ok(())
    }
}

/// Parses `q1=10000,q2=5000` style arguments into a revenue map.
pub(crate) fn parse_revenue(raw: &str) -> Result<RevenueByQuarter, String> {
    let mut revenue = RevenueByQuarter::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (key, amount) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected QUARTER=AMOUNT, got '{entry}'"))?;
        let quarter = Quarter::from_key(key.trim())
            .ok_or_else(|| format!("unknown quarter '{}' (use q1, q2 or q3)", key.trim()))?;
        let amount: f64 = amount
            .trim()
            .parse()
            .map_err(|err| format!("failed to parse '{}' as an amount ({err})", amount.trim()))?;
        revenue.insert(quarter, amount);
    }
    Ok(revenue)
}

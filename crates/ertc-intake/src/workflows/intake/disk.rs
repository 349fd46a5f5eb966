//! File-system backed document store.
//!
//! Layout under the configured root:
//! `submissions/<id>.json` for records and
//! `attachments/<submission>/<attachment>.{bin,json}` for binaries plus metadata.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, warn};

use super::domain::{
    AttachmentId, AttachmentMeta, NewAttachment, StoredAttachment, SubmissionId, SubmissionRecord,
};
use super::repository::{AttachmentError, AttachmentStore, RepositoryError, SubmissionRepository};

/// Identifiers become file names, so only a conservative alphabet is accepted.
fn is_safe_component(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= 128
        && raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[derive(Debug)]
pub struct JsonFileSubmissionRepository {
    root: PathBuf,
    sequence: AtomicU64,
}

impl JsonFileSubmissionRepository {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let root = storage_dir.as_ref().join("submissions");
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            sequence: AtomicU64::new(1),
        })
    }

    fn path_for(&self, id: &SubmissionId) -> Option<PathBuf> {
        is_safe_component(&id.0).then(|| self.root.join(format!("{}.json", id.0)))
    }

    fn write(&self, path: &Path, record: &SubmissionRecord) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        write_atomically(path, &bytes)?;
        Ok(())
    }
}

impl SubmissionRepository for JsonFileSubmissionRepository {
    fn next_id(&self) -> Result<SubmissionId, RepositoryError> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        loop {
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            let id = SubmissionId(format!("sub-{stamp}-{seq:04}"));
            let taken = self.path_for(&id).map(|path| path.exists()).unwrap_or(true);
            if !taken {
                return Ok(id);
            }
        }
    }

    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let path = self.path_for(&record.id).ok_or_else(|| {
            RepositoryError::Unavailable(format!("unsupported submission id '{}'", record.id))
        })?;
        if path.exists() {
            return Err(RepositoryError::Conflict);
        }
        self.write(&path, &record)?;
        debug!(submission_id = %record.id, path = %path.display(), "submission written");
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let Some(path) = self.path_for(id).filter(|path| path.exists()) else {
            return Ok(None);
        };
        let bytes = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn list(&self, limit: usize) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            match serde_json::from_slice::<SubmissionRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable submission"
                ),
            }
        }

        records.sort_by(|a, b| {
            b.received_at
                .cmp(&a.received_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Debug)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let root = storage_dir.as_ref().join("attachments");
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn submission_dir(&self, submission: &SubmissionId) -> Option<PathBuf> {
        is_safe_component(&submission.0).then(|| self.root.join(&submission.0))
    }
}

impl AttachmentStore for FsAttachmentStore {
    fn put(
        &self,
        submission: &SubmissionId,
        attachment: NewAttachment,
    ) -> Result<AttachmentMeta, AttachmentError> {
        let dir = self.submission_dir(submission).ok_or_else(|| {
            AttachmentError::Unavailable(format!("unsupported submission id '{submission}'"))
        })?;
        fs::create_dir_all(&dir)?;

        let mut index = 1usize;
        let id = loop {
            let candidate = AttachmentId(format!("att-{index:03}"));
            if !dir.join(format!("{}.bin", candidate.0)).exists() {
                break candidate;
            }
            index += 1;
        };

        let meta = AttachmentMeta {
            content_type: attachment.resolved_content_type(),
            id,
            kind: attachment.kind,
            field_name: attachment.field_name,
            file_name: attachment.file_name,
            size: attachment.bytes.len() as u64,
            stored_at: Utc::now(),
        };

        write_atomically(&dir.join(format!("{}.bin", meta.id.0)), &attachment.bytes)?;
        write_atomically(
            &dir.join(format!("{}.json", meta.id.0)),
            &serde_json::to_vec_pretty(&meta)?,
        )?;

        Ok(meta)
    }

    fn get(
        &self,
        submission: &SubmissionId,
        id: &AttachmentId,
    ) -> Result<Option<StoredAttachment>, AttachmentError> {
        let Some(dir) = self.submission_dir(submission) else {
            return Ok(None);
        };
        if !is_safe_component(&id.0) {
            return Ok(None);
        }

        let meta_path = dir.join(format!("{}.json", id.0));
        let bin_path = dir.join(format!("{}.bin", id.0));
        if !meta_path.exists() || !bin_path.exists() {
            return Ok(None);
        }

        let meta: AttachmentMeta = serde_json::from_slice(&fs::read(meta_path)?)?;
        let bytes = fs::read(bin_path)?;
        Ok(Some(StoredAttachment { meta, bytes }))
    }

    fn remove(&self, submission: &SubmissionId, id: &AttachmentId) -> Result<(), AttachmentError> {
        let Some(dir) = self.submission_dir(submission) else {
            return Ok(());
        };
        if !is_safe_component(&id.0) {
            return Ok(());
        }

        for extension in ["bin", "json"] {
            match fs::remove_file(dir.join(format!("{}.{extension}", id.0))) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        // only succeeds once the directory is empty
        let _ = fs::remove_dir(&dir);
        Ok(())
    }
}

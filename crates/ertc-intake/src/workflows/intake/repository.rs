use super::domain::{
    AttachmentId, AttachmentMeta, NewAttachment, StoredAttachment, SubmissionId, SubmissionRecord,
};

/// Storage abstraction for submission documents.
pub trait SubmissionRepository: Send + Sync {
    /// Reserves a fresh identifier. Implementations own their sequence.
    fn next_id(&self) -> Result<SubmissionId, RepositoryError>;
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError>;
    /// Newest first.
    fn list(&self, limit: usize) -> Result<Vec<SubmissionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("repository io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored record is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Binary storage for uploaded files and generated reports.
pub trait AttachmentStore: Send + Sync {
    fn put(
        &self,
        submission: &SubmissionId,
        attachment: NewAttachment,
    ) -> Result<AttachmentMeta, AttachmentError>;
    fn get(
        &self,
        submission: &SubmissionId,
        id: &AttachmentId,
    ) -> Result<Option<StoredAttachment>, AttachmentError>;
    /// Deletes a stored binary. Removing an unknown id is not an error.
    fn remove(&self, submission: &SubmissionId, id: &AttachmentId) -> Result<(), AttachmentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("attachment store unavailable: {0}")]
    Unavailable(String),
    #[error("attachment io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("attachment metadata is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

//! Webhook intake: payload extraction, document storage, report generation
//! and the HTTP surface that reads it all back.

pub mod disk;
pub mod domain;
pub mod extraction;
pub mod forwarder;
pub mod repository;
pub mod router;
pub mod service;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use disk::{FsAttachmentStore, JsonFileSubmissionRepository};
pub use domain::{
    sanitize_file_name, AttachmentId, AttachmentKind, AttachmentMeta, NewAttachment,
    StoredAttachment, SubmissionId, SubmissionListEntry, SubmissionRecord, SubmissionView,
    WebhookSubmission,
};
pub use extraction::{
    ExtractedRevenue, ExtractionContract, ExtractionError, FieldPath, QuarterField, RevenueYears,
    CURRENT_CONTRACT_VERSION,
};
pub use forwarder::{ForwardError, ForwardPayload, SubmissionForwarder};
pub use repository::{AttachmentError, AttachmentStore, RepositoryError, SubmissionRepository};
pub use router::{intake_router, IntakeState};
pub use service::{IntakeError, IntakeService};
pub use webhook::{read_multipart, WebhookError};

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{AttachmentId, StoredAttachment, SubmissionId};
use super::forwarder::SubmissionForwarder;
use super::repository::{AttachmentStore, SubmissionRepository};
use super::service::{IntakeError, IntakeService};
use super::webhook::read_multipart;
use crate::workflows::qualification::{analyze, QualificationSummary, RevenueByQuarter};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

pub struct IntakeState<R, A> {
    pub service: Arc<IntakeService<R, A>>,
    pub forwarder: Option<Arc<SubmissionForwarder>>,
}

impl<R, A> Clone for IntakeState<R, A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            forwarder: self.forwarder.clone(),
        }
    }
}

/// Router builder exposing the webhook, read and download endpoints.
///
/// Request bodies above `max_upload_bytes` are rejected with 413.
pub fn intake_router<R, A>(
    service: Arc<IntakeService<R, A>>,
    forwarder: Option<Arc<SubmissionForwarder>>,
    max_upload_bytes: usize,
) -> Router
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    Router::new()
        .route("/api/v1/webhook", post(webhook_handler::<R, A>))
        .route("/api/v1/submissions", get(list_handler::<R, A>))
        .route(
            "/api/v1/submissions/:submission_id",
            get(detail_handler::<R, A>),
        )
        .route(
            "/api/v1/submissions/:submission_id/report",
            get(report_handler::<R, A>),
        )
        .route(
            "/api/v1/submissions/:submission_id/attachments/:attachment_id",
            get(attachment_handler::<R, A>),
        )
        .route("/api/v1/qualification/analyze", post(analyze_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(IntakeState { service, forwarder })
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "intake request failed");
        }
        error_response(status, self.to_string())
    }
}

/// Repository and attachment stores do blocking I/O; keep it off the async workers.
async fn run_blocking<R, A, T, F>(
    service: Arc<IntakeService<R, A>>,
    job: F,
) -> Result<T, IntakeError>
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
    T: Send + 'static,
    F: FnOnce(&IntakeService<R, A>) -> Result<T, IntakeError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&service))
        .await
        .map_err(|err| IntakeError::Worker(err.to_string()))?
}

pub(crate) async fn webhook_handler<R, A>(
    State(state): State<IntakeState<R, A>>,
    multipart: Multipart,
) -> Response
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    let submission = match read_multipart(multipart).await {
        Ok(submission) => submission,
        Err(err) => {
            warn!(error = %err, "rejected webhook delivery");
            return error_response(err.status(), err.to_string());
        }
    };

    match run_blocking(state.service, move |service| service.ingest(submission)).await {
        Ok(record) => {
            let view = record.view();
            if let Some(forwarder) = &state.forwarder {
                forwarder.spawn(record);
            }
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<usize>,
}

pub(crate) async fn list_handler<R, A>(
    State(state): State<IntakeState<R, A>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    match run_blocking(state.service, move |service| service.list(limit)).await {
        Ok(records) => {
            let entries: Vec<_> = records.iter().map(|record| record.list_entry()).collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn detail_handler<R, A>(
    State(state): State<IntakeState<R, A>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    let id = SubmissionId(submission_id);
    match run_blocking(state.service, move |service| service.get(&id)).await {
        Ok(record) => (StatusCode::OK, Json(record.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn report_handler<R, A>(
    State(state): State<IntakeState<R, A>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    let id = SubmissionId(submission_id);
    match run_blocking(state.service, move |service| service.report(&id)).await {
        Ok(stored) => download_response(stored),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn attachment_handler<R, A>(
    State(state): State<IntakeState<R, A>>,
    Path((submission_id, attachment_id)): Path<(String, String)>,
) -> Response
where
    R: SubmissionRepository + 'static,
    A: AttachmentStore + 'static,
{
    let id = SubmissionId(submission_id);
    let attachment_id = AttachmentId(attachment_id);
    match run_blocking(state.service, move |service| {
        service.attachment(&id, &attachment_id)
    })
    .await
    {
        Ok(stored) => download_response(stored),
        Err(err) => err.into_response(),
    }
}

fn download_response(stored: StoredAttachment) -> Response {
    let content_type = HeaderValue::from_str(&stored.meta.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", stored.meta.file_name))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        stored.bytes,
    )
        .into_response()
}

/// Absent and `null` revenue maps both read as all-zero quarters.
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    #[serde(default)]
    baseline: Option<RevenueByQuarter>,
    #[serde(default)]
    comparison: Option<RevenueByQuarter>,
}

pub(crate) async fn analyze_handler(
    Json(request): Json<AnalyzeRequest>,
) -> Json<QualificationSummary> {
    let baseline = request.baseline.unwrap_or_default();
    let comparison = request.comparison.unwrap_or_default();
    Json(analyze(&baseline, &comparison))
}

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::domain::{SubmissionId, SubmissionRecord};

const FORWARD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("forward request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Body relayed to the secondary webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardPayload<'a> {
    pub submission_id: &'a SubmissionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<&'a str>,
    pub received_at: DateTime<Utc>,
    pub payload: &'a Value,
    pub qualifying_quarters: &'a [String],
}

impl<'a> ForwardPayload<'a> {
    pub fn from_record(record: &'a SubmissionRecord) -> Self {
        Self {
            submission_id: &record.id,
            form_id: record.form_id.as_deref(),
            received_at: record.received_at,
            payload: &record.payload,
            qualifying_quarters: record.qualifying_quarters(),
        }
    }
}

/// Relays accepted submissions to a second webhook.
#[derive(Debug, Clone)]
pub struct SubmissionForwarder {
    client: reqwest::Client,
    target: String,
}

impl SubmissionForwarder {
    pub fn new(target: impl Into<String>) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            target: target.into(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn forward(&self, record: &SubmissionRecord) -> Result<(), ForwardError> {
        self.client
            .post(&self.target)
            .json(&ForwardPayload::from_record(record))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fire-and-forget; the webhook response never waits on the relay.
    pub fn spawn(self: &Arc<Self>, record: SubmissionRecord) {
        let forwarder = Arc::clone(self);
        tokio::spawn(async move {
            match forwarder.forward(&record).await {
                Ok(()) => debug!(
                    submission_id = %record.id,
                    target = %forwarder.target,
                    "submission forwarded"
                ),
                Err(err) => warn!(
                    submission_id = %record.id,
                    target = %forwarder.target,
                    error = %err,
                    "failed to forward submission"
                ),
            }
        });
    }
}

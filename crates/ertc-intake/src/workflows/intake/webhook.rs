use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use serde_json::{Map, Value};
use tracing::debug;

use super::domain::{NewAttachment, WebhookSubmission};

/// Multipart text parts that carry the JSON form payload.
const PAYLOAD_FIELDS: [&str; 2] = ["rawRequest", "payload"];
const FORM_ID_FIELDS: [&str; 2] = ["formID", "formId"];

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook is missing a form payload (rawRequest or payload field)")]
    MissingPayload,
    #[error("form payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MissingPayload | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Multipart(err) => err.status(),
        }
    }
}

/// Splits a webhook delivery into the JSON payload, loose text fields and files.
///
/// Text parts other than the payload and form id are merged into the payload
/// object without overwriting keys the payload already has.
pub async fn read_multipart(mut multipart: Multipart) -> Result<WebhookSubmission, WebhookError> {
    let mut raw_payload: Option<String> = None;
    let mut form_id: Option<String> = None;
    let mut loose_fields: Vec<(String, String)> = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        match file_name {
            Some(file_name) => {
                let bytes = field.bytes().await?;
                if file_name.trim().is_empty() && bytes.is_empty() {
                    // browsers send an empty part for untouched file inputs
                    continue;
                }
                debug!(
                    field = ?name,
                    file_name = %file_name,
                    size = bytes.len(),
                    "received upload"
                );
                files.push(NewAttachment::upload(
                    name,
                    &file_name,
                    content_type,
                    bytes.to_vec(),
                ));
            }
            None => {
                let text = field.text().await?;
                match name.as_deref() {
                    Some(key) if PAYLOAD_FIELDS.contains(&key) => raw_payload = Some(text),
                    Some(key) if FORM_ID_FIELDS.contains(&key) => {
                        form_id = Some(text.trim().to_string()).filter(|id| !id.is_empty());
                    }
                    Some(key) if !key.is_empty() => loose_fields.push((key.to_string(), text)),
                    _ => {}
                }
            }
        }
    }

    let mut payload = match raw_payload {
        Some(raw) => serde_json::from_str::<Value>(&raw)?,
        None if !loose_fields.is_empty() => Value::Object(Map::new()),
        None => return Err(WebhookError::MissingPayload),
    };

    if let Value::Object(map) = &mut payload {
        for (key, text) in loose_fields {
            map.entry(key).or_insert(Value::String(text));
        }
    }

    Ok(WebhookSubmission {
        form_id,
        payload,
        files,
    })
}

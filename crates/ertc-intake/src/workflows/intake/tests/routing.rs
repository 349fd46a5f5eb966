use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::intake::router::{detail_handler, IntakeState};
use crate::workflows::intake::IntakeService;

fn revenue_json() -> String {
    revenue_payload().to_string()
}

#[tokio::test]
async fn webhook_accepts_multipart_with_files() {
    let (service, _, attachments) = build_service();
    let router = router_with_service(service);
    let payload = revenue_json();

    let response = router
        .oneshot(multipart_request(
            "/api/v1/webhook",
            &[
                Part::Text("formID", "231"),
                Part::Text("rawRequest", &payload),
                Part::Text("submitterNote", "sent from the portal"),
                Part::File {
                    name: "bankStatements",
                    file_name: "q1 statements.pdf",
                    content_type: "application/pdf",
                    bytes: b"%PDF-1.4 body",
                },
            ],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["submissionId"], json!("sub-000001"));
    assert_eq!(body["formId"], json!("231"));
    assert_eq!(body["qualifyingQuarters"], json!(["Quarter 1", "Quarter 3"]));
    assert_eq!(body["analysis"][0]["percentDecrease"], json!(60.0));
    assert_eq!(body["analysis"][1]["qualifies"], json!(false));
    assert_eq!(body["payload"]["submitterNote"], json!("sent from the portal"));
    assert_eq!(body["attachments"][0]["fileName"], json!("q1 statements.pdf"));
    assert_eq!(body["attachments"][0]["fieldName"], json!("bankStatements"));
    assert_eq!(body["report"]["contentType"], json!("text/csv"));
    assert_eq!(attachments.count(), 2);
}

#[tokio::test]
async fn webhook_without_payload_is_bad_request() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/webhook",
            &[Part::File {
                name: "upload",
                file_name: "a.txt",
                content_type: "text/plain",
                bytes: b"hello",
            }],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("missing a form payload"));
}

#[tokio::test]
async fn webhook_with_invalid_json_is_bad_request() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/webhook",
            &[Part::Text("rawRequest", "{not json")],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_array_payload_is_unprocessable() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/webhook",
            &[Part::Text("payload", "[1,2,3]")],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn loose_text_fields_form_the_payload() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/webhook",
            &[
                Part::Text("q1_2019", "2000"),
                Part::Text("q1_2021", "900"),
            ],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["qualifyingQuarters"], json!(["Quarter 1"]));
    assert_eq!(repository.records.lock().expect("mutex").len(), 1);
}

#[tokio::test]
async fn report_download_sets_csv_headers() {
    let (service, _, _) = build_service();
    let record = service.ingest(webhook_submission()).expect("ingest");
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/submissions/{}/report", record.id))
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(b"text/csv".as_slice())
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"report-sub-000001.csv\"")
    );
    let text = String::from_utf8(read_body(response).await).expect("utf8");
    assert!(text.starts_with("Submission Report"));
}

#[tokio::test]
async fn attachment_download_returns_stored_bytes() {
    let (service, _, _) = build_service();
    let record = service.ingest(webhook_submission()).expect("ingest");
    let attachment_id = record.attachments[0].id.clone();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get(format!(
                "/api/v1/submissions/{}/attachments/{}",
                record.id, attachment_id
            ))
            .body(axum::body::Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(b"application/pdf".as_slice())
    );
    assert_eq!(read_body(response).await, b"%PDF-1.7 fake".to_vec());
}

#[tokio::test]
async fn list_route_returns_entries() {
    let (service, _, _) = build_service();
    service.ingest(webhook_submission()).expect("first");
    service.ingest(webhook_submission()).expect("second");
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/submissions?limit=1")
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let entries = body.as_array().expect("array body");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["submissionId"], json!("sub-000002"));
    assert_eq!(entries[0]["attachmentCount"], json!(1));
    assert_eq!(entries[0]["hasReport"], json!(true));
}

#[tokio::test]
async fn detail_handler_returns_not_found_for_unknown_id() {
    let (service, _, _) = build_service();
    let state = IntakeState {
        service: Arc::new(service),
        forwarder: None,
    };

    let response = detail_handler(State(state), Path("sub-missing".to_string())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("submission sub-missing not found"));
}

#[tokio::test]
async fn detail_handler_surfaces_store_outage() {
    let service = IntakeService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryAttachments::default()),
    );
    let state = IntakeState {
        service: Arc::new(service),
        forwarder: None,
    };

    let response = detail_handler(State(state), Path("sub-000001".to_string())).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn analyze_route_accepts_loose_values() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/qualification/analyze")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    json!({
                        "baseline": { "q2": "10000", "q3": "garbage" },
                        "comparison": { "q2": 5000 }
                    })
                    .to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["qualifyingQuarters"], json!(["Quarter 2"]));
    assert_eq!(body["results"][1]["quarter"], json!("Quarter 2"));
    assert_eq!(body["results"][1]["percentDecrease"], json!(50.0));
    assert_eq!(body["results"][2]["baselineRevenue"], json!(0.0));
}

#[tokio::test]
async fn analyze_route_treats_null_maps_as_empty() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/qualification/analyze")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    json!({ "baseline": null, "comparison": { "q1": 5 } }).to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["qualifyingQuarters"], json!([]));
    assert_eq!(body["results"][0]["comparisonRevenue"], json!(5.0));
    assert_eq!(body["results"][0]["percentDecrease"], json!(0.0));
}

#[tokio::test]
async fn webhook_over_the_body_limit_is_rejected() {
    let (service, repository, attachments) = build_service();
    let router = router_with_limit(service, 64);
    let oversized = "x".repeat(4096);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/webhook",
            &[Part::Text("rawRequest", &oversized)],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(repository.records.lock().expect("mutex").is_empty());
    assert_eq!(attachments.count(), 0);
}

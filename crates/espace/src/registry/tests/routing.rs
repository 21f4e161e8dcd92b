use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::caller::{Caller, CallerKind};

fn request(method: Method, uri: &str, caller: &Caller, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", caller.user_id.to_string())
        .header("x-user-login", caller.login.clone());
    builder = match caller.kind {
        CallerKind::Staff { soato } => builder
            .header("x-user-type", "staff")
            .header("x-user-soato", soato.to_string()),
        CallerKind::Applicant => builder.header("x-user-type", "applicant"),
    };

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds")
}

fn entity_body() -> Value {
    serde_json::to_value(entity_submission(REGION)).expect("submission serializes")
}

async fn create_entity(router: &axum::Router) -> Value {
    let response = router
        .clone()
        .oneshot(request(Method::POST, "/api/v1/entities", &staff(), Some(entity_body())))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json_body(response).await
}

#[tokio::test]
async fn create_entity_returns_numbered_record() {
    let harness = Harness::new();
    let router = harness.router();

    let payload = create_entity(&router).await;

    assert_eq!(payload["entity_number"], "B1703-1");
    assert_eq!(payload["entity_soato"], 1703);
    assert_eq!(payload["version"], 2);
    assert_eq!(payload["status"], s1().to_string());
}

#[tokio::test]
async fn parent_status_route_advances_entity() {
    let harness = Harness::new();
    let router = harness.router();
    let created = create_entity(&router).await;
    let id = created["id"].as_str().expect("id").to_string();

    let response = router
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/entities/{id}/parent-status"),
            &staff(),
            Some(json!({ "status_id": s1().to_string() })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], s2().to_string());
}

#[tokio::test]
async fn advancing_past_last_status_is_not_found() {
    let harness = Harness::new();
    let router = harness.router();
    let created = create_entity(&router).await;
    let id = created["id"].as_str().expect("id").to_string();

    let response = router
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/entities/{id}/status"),
            &staff(),
            Some(json!({ "status_id": s3().to_string() })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/entities/{id}/parent-status"),
            &staff(),
            Some(json!({ "status_id": s3().to_string() })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "not_found");
    assert_eq!(payload["retryable"], false);
}

#[tokio::test]
async fn offline_repository_is_retryable_unavailable() {
    let response = unavailable_router()
        .oneshot(request(Method::GET, "/api/v1/entities", &staff(), None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "internal");
    assert_eq!(payload["retryable"], true);
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let harness = Harness::new();

    let response = harness
        .router()
        .oneshot(
            Request::get("/api/v1/entity-drafts")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn zero_page_is_bad_request() {
    let harness = Harness::new();

    let response = harness
        .router()
        .oneshot(request(Method::GET, "/api/v1/entities?page=0", &staff(), None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "validation");
}

#[tokio::test]
async fn draft_lifecycle_over_http() {
    let harness = Harness::new();
    let router = harness.router();

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/entity-drafts",
            &applicant(),
            Some(serde_json::to_value(draft_submission(REGION)).expect("serializes")),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let draft = read_json_body(response).await;
    assert_eq!(draft["entity_draft_number"], "T1703-1");
    let draft_id = draft["id"].as_str().expect("id").to_string();

    let response = router
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/entity-drafts/{draft_id}/confirm"),
            &staff(),
            Some(json!({ "status_id": s2().to_string(), "comment": "" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/entity-drafts/{draft_id}/confirm"),
            &staff(),
            Some(json!({ "status_id": s2().to_string(), "comment": "ok" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let confirmed = read_json_body(response).await;
    assert_eq!(confirmed["status"], s2().to_string());
    assert_eq!(confirmed["comment"], "ok");

    let response = router
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/entity-drafts-expired",
            &applicant(),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/entity-drafts/{draft_id}/permanent"),
            &staff(),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(harness.store.draft_count().expect("count"), 0);
}

#[tokio::test]
async fn attach_route_links_draft_to_entity() {
    let harness = Harness::new();
    let router = harness.router();
    let entity = create_entity(&router).await;
    let entity_id = entity["id"].as_str().expect("id").to_string();
    let draft = harness
        .drafts
        .create(&applicant(), draft_submission(REGION))
        .expect("draft");

    let response = router
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/entities/{entity_id}/drafts/{}", draft.id),
            &staff(),
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["entity_drafts"], json!([draft.id.to_string()]));
}

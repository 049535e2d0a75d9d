use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use section_scheduler::config::{BackendKind, SolverConfig};
use section_scheduler::server::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app(backend: BackendKind) -> axum::Router {
    router(AppState {
        backend,
        solver: Arc::new(SolverConfig::default()),
    })
}

fn submission() -> Value {
    json!({
        "instructors": [
            { "name": "Ada", "department": "CS" }
        ],
        "rooms": [
            { "name": "B12", "studentCapacity": 40, "permittedDepartments": ["CS"] }
        ],
        "courses": [
            {
                "name": "cs101",
                "displayName": "CS 101",
                "department": "CS",
                "enrollment": 30,
                "numberOfSections": 2,
                "preferredTimeslots": [1, 2]
            }
        ],
        "timeslots": [
            { "Monday": [{ "start": "09:00", "end": "10:00" }] },
            { "Tuesday": [{ "start": "09:00", "end": "10:00" }] }
        ]
    })
}

async fn post(app: axum::Router, body: &Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/schedule/solve")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn solves_a_submission() {
    for backend in [BackendKind::Highs, BackendKind::Search] {
        let (status, body) = post(app(backend), &submission()).await;
        assert_eq!(status, StatusCode::OK);

        let result: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(result["status"], "SUCCESS");
        assert_eq!(result["message"], "");
        assert_eq!(result["penalty"], 0);
        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_ne!(results[0]["patternIndex"], results[1]["patternIndex"]);
        assert_eq!(results[0]["instructor"]["name"], "Ada");
    }
}

#[tokio::test]
async fn infeasible_submission_is_still_ok() {
    let mut body = submission();
    body["rooms"][0]["studentCapacity"] = json!(10);
    let (status, bytes) = post(app(BackendKind::Highs), &body).await;
    assert_eq!(status, StatusCode::OK);

    let result: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(result["status"], "FAILED");
    assert_eq!(
        result["message"],
        "There is a course with enrollment over all rooms' capacities"
    );
    assert_eq!(result["results"], json!([]));
}

#[tokio::test]
async fn malformed_submission_is_rejected() {
    let mut body = submission();
    body["timeslots"][0] = json!({ "Someday": [{ "start": "09:00", "end": "10:00" }] });
    let (status, bytes) = post(app(BackendKind::Highs), &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(bytes).unwrap(), "Unrecognized day of week: Someday");
}

#[tokio::test]
async fn health_check() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app(BackendKind::Highs).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

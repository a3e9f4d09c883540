//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode},
};
use classbook_core::{
  ids::{CourseId, GroupId, StudentId, SubTopicId, TeachingPlanId},
  reference::{ReferenceData, StudentGroupEntry, SubTopicEntry, TeachingPlanEntry},
};
use classbook_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn router() -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  store
    .import_reference(ReferenceData {
      teaching_plans: vec![TeachingPlanEntry {
        id:        TeachingPlanId(1),
        course_id: CourseId(1),
        title:     "Programming I".into(),
      }],
      groups:         vec![StudentGroupEntry {
        id:      GroupId(100),
        plan_id: TeachingPlanId(1),
        name:    "A".into(),
        members: vec![StudentId(1), StudentId(2)],
      }],
      sub_topics:     vec![SubTopicEntry {
        id:            SubTopicId(10),
        course_id:     CourseId(1),
        title:         "Loops".into(),
        chapter_title: "Control flow".into(),
      }],
      lessons:        vec![],
    })
    .await
    .expect("reference data");
  api_router(Arc::new(store))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let request = Request::builder()
    .method(method)
    .uri(uri)
    .header("content-type", "application/json");
  let request = match body {
    Some(body) => request.body(Body::from(body.to_string())),
    None => request.body(Body::empty()),
  }
  .unwrap();

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

async fn create_session(app: &Router, date: &str) -> i64 {
  let (status, body) = send(
    app,
    Method::POST,
    "/sessions",
    Some(json!({
      "plan_id": 1,
      "title": "Loops",
      "session_date": date,
      "teacher_id": 7,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["success"], true);
  body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn create_get_delete_session() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, body) = send(&app, Method::GET, &format!("/sessions/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mode"], "in_person");
  assert_eq!(body["current_step"], 0);

  let (status, _) = send(&app, Method::DELETE, &format!("/sessions/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, body) = send(&app, Method::GET, &format!("/sessions/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_plan_is_404() {
  let app = router().await;
  let (status, body) = send(
    &app,
    Method::POST,
    "/sessions",
    Some(json!({
      "plan_id": 9,
      "title": "Loops",
      "session_date": "2026-03-02",
      "teacher_id": 7,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "not found: teaching plan 9");
}

#[tokio::test]
async fn invalid_rating_is_422_with_fields() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, body) = send(
    &app,
    Method::PUT,
    &format!("/sessions/{id}/feedback"),
    Some(json!({
      "groups": [{ "group_id": 100, "understanding_level": 6, "participation_level": 3 }]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["success"], false);
  assert_eq!(body["fields"][0]["field"], "groups[0].understanding_level");
}

#[tokio::test]
async fn mistyped_body_is_422_envelope() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, body) = send(
    &app,
    Method::PUT,
    &format!("/sessions/{id}/feedback"),
    Some(json!({
      "groups": [{ "group_id": 100, "understanding_level": "high", "participation_level": 3 }]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["success"], false);
  assert_eq!(body["fields"][0]["field"], "body");

  let (status, body) = send(
    &app,
    Method::PUT,
    &format!("/sessions/{id}/groups/100/coverage"),
    Some(json!({ "entries": [{
      "topic_kind": "sub_topic",
      "topic_id": 10,
      "coverage_percentage": 50.5,
      "coverage_status": "partially_covered",
    }]})),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["fields"][0]["field"], "body");

  let request = Request::builder()
    .method(Method::PUT)
    .uri(format!("/sessions/{id}/groups/100/execution"))
    .header("content-type", "application/json")
    .body(Body::from("{ not json"))
    .unwrap();
  let response = app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["success"], false);
  assert_eq!(body["fields"][0]["field"], "body");

  let (status, body) = send(&app, Method::GET, &format!("/sessions/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["current_step"], 0);
}

#[tokio::test]
async fn step_header_mismatch_is_422() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, body) = send(
    &app,
    Method::POST,
    &format!("/sessions/{id}/steps"),
    Some(json!({ "step_number": 1, "step_name": "Feedback", "payload": [] })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["fields"][0]["field"], "step_name");
}

#[tokio::test]
async fn completing_early_is_412() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, _) = send(
    &app,
    Method::POST,
    &format!("/sessions/{id}/steps"),
    Some(json!({
      "step_number": 1,
      "step_name": "Attendance",
      "payload": [{ "group_id": 100, "records": [{ "student_id": 1, "status": "present" }] }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(&app, Method::POST, &format!("/sessions/{id}/complete"), None).await;
  assert_eq!(status, StatusCode::PRECONDITION_FAILED);
  assert_eq!(body["error"], "precondition failed: step Feedback has no saved data");

  let (status, body) = send(&app, Method::GET, &format!("/sessions/{id}/progress"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["current_step"], 1);
  assert_eq!(body["total_steps"], 3);
  assert_eq!(body["is_completed"], false);
}

#[tokio::test]
async fn full_workflow_and_progress() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, _) = send(
    &app,
    Method::PUT,
    &format!("/sessions/{id}/attendance"),
    Some(json!({
      "groups": [{ "group_id": 100, "records": [
        { "student_id": 1, "status": "present", "participation_score": 80 },
        { "student_id": 2, "status": "absent" },
      ]}]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = send(
    &app,
    Method::PUT,
    &format!("/sessions/{id}/feedback"),
    Some(json!({
      "groups": [{ "group_id": 100, "understanding_level": 4, "participation_level": 5 }]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    &app,
    Method::POST,
    &format!("/sessions/{id}/steps"),
    Some(json!({
      "step_number": 3,
      "step_name": "topic_coverage",
      "mark_completed": true,
      "payload": [{ "group_id": 100, "entries": [{
        "topic_kind": "sub_topic",
        "topic_id": 10,
        "was_planned": true,
        "was_covered": true,
        "coverage_percentage": 100,
        "coverage_status": "mostly_covered",
      }]}],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["is_completed"], true);

  let (status, body) = send(&app, Method::GET, "/teaching-plans/1/progress?group_id=100", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["overall_progress_percentage"], 100);
  assert_eq!(body[0]["sessions_count"], 1);

  let (status, body) = send(&app, Method::GET, &format!("/sessions/{id}/attendance"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);

  let (status, body) =
    send(&app, Method::POST, "/teaching-plans/1/progress/rebuild", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["summaries"], 1);
}

#[tokio::test]
async fn group_coverage_round_trip() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;
  let uri = format!("/sessions/{id}/groups/100/coverage");

  let (status, body) = send(
    &app,
    Method::PUT,
    &uri,
    Some(json!({ "entries": [{
      "topic_kind": "additional",
      "topic_title": "Debugging demo",
      "coverage_percentage": 50,
      "coverage_status": "partially_covered",
    }]})),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"][0]["topic_title"], "Debugging demo");

  let (status, body) = send(&app, Method::GET, &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["topic_kind"], "additional");

  let (status, _) = send(&app, Method::GET, &format!("/sessions/{id}/groups/999/coverage"), None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = send(&app, Method::PUT, &format!("/sessions/{id}/groups/999/coverage"), Some(json!({ "entries": [] }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_plan_and_execution_are_404() {
  let app = router().await;
  let id = create_session(&app, "2026-03-02").await;

  let (status, _) = send(&app, Method::GET, &format!("/sessions/{id}/groups/100/plan"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send(
    &app,
    Method::PUT,
    &format!("/sessions/{id}/groups/100/plan"),
    Some(json!({ "planned_sub_topics": [10], "planned_objectives": "for loops" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["planned_sub_topics"], json!([10]));

  let (status, _) =
    send(&app, Method::GET, &format!("/sessions/{id}/groups/100/execution"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

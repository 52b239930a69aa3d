use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use eval_registry::api::{create_router, ACCESSIBLE_WORKFLOWS_HEADER};
use eval_registry::{MemoryStore, TestDefinitionsService};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::with_annotation_tags(["t1"]));
        let service = Arc::new(TestDefinitionsService::new(store.clone(), store));
        Self {
            router: create_router::<MemoryStore>().with_state(service),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        scope: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(scope) = scope {
            builder = builder.header(ACCESSIBLE_WORKFLOWS_HEADER, scope);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, body: Value) -> Value {
        let (status, value) = self
            .request(Method::POST, "/test-definitions", Some("w1,w2"), Some(body))
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", value);
        value
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_fetch() {
    let app = TestApp::new();
    let created = app
        .create(json!({
            "name": "  Checkout flow  ",
            "workflowId": "w1",
            "evaluationWorkflowId": "w2",
        }))
        .await;
    assert_eq!(created["name"], "Checkout flow");
    assert_eq!(created["workflow"]["id"], "w1");
    assert_eq!(created["evaluationWorkflow"]["id"], "w2");

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = app
        .request(Method::GET, &format!("/test-definitions/{}", id), Some("w1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Checkout flow");

    let (status, body) = app
        .request(Method::GET, &format!("/test-definitions/{}", id), Some("w3"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Test definition not found");
}

#[tokio::test]
async fn test_create_requires_workflow_access() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/test-definitions",
            Some("w1"),
            Some(json!({ "name": "T1", "workflowId": "w9" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User does not have access to the workflow");

    let (status, _) = app
        .request(
            Method::POST,
            "/test-definitions",
            Some("w1"),
            Some(json!({ "name": "T1", "workflowId": "w1", "evaluationWorkflowId": "w9" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_without_workflow_is_a_validation_error() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/test-definitions",
            Some("w1"),
            Some(json!({ "name": "Orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["field"], "workflow");
}

#[tokio::test]
async fn test_patch_keeps_workflow_and_checks_tag() {
    let app = TestApp::new();
    let created = app.create(json!({ "name": "T1", "workflowId": "w1" })).await;
    let path = format!("/test-definitions/{}", created["id"]);

    let (status, updated) = app
        .request(
            Method::PATCH,
            &path,
            Some("w1,w2"),
            Some(json!({ "name": "T2", "workflowId": "w2", "annotationTagId": "t1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "T2");
    assert_eq!(updated["workflow"]["id"], "w1");
    assert_eq!(updated["annotationTag"]["id"], "t1");

    let (status, body) = app
        .request(
            Method::PATCH,
            &path,
            Some("w1"),
            Some(json!({ "annotationTagId": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Annotation tag not found");
}

#[tokio::test]
async fn test_patch_unknown_id_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::PATCH,
            "/test-definitions/404",
            Some("w1"),
            Some(json!({ "name": "Ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Test definition not found");
}

#[tokio::test]
async fn test_patch_outside_scope_leaves_definition_untouched() {
    let app = TestApp::new();
    let created = app.create(json!({ "name": "T1", "workflowId": "w1" })).await;
    let path = format!("/test-definitions/{}", created["id"]);

    let (status, body) = app
        .request(
            Method::PATCH,
            &path,
            Some("w2"),
            Some(json!({ "name": "hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Test definition not found");

    let (status, fetched) = app.request(Method::GET, &path, Some("w1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "T1");
}

#[tokio::test]
async fn test_list_name_filter_is_literal() {
    let app = TestApp::new();
    app.create(json!({ "name": "Alpha", "workflowId": "w1" })).await;
    app.create(json!({ "name": "100% coverage", "workflowId": "w1" })).await;

    let (status, body) = app
        .request(Method::GET, "/test-definitions?name=_", Some("w1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (_, body) = app
        .request(Method::GET, "/test-definitions?name=%25", Some("w1"), None)
        .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["name"], "100% coverage");
}

#[tokio::test]
async fn test_list_accepts_oversized_take() {
    let app = TestApp::new();
    app.create(json!({ "name": "Alpha", "workflowId": "w1" })).await;

    let (status, body) = app
        .request(
            Method::GET,
            "/test-definitions?take=18446744073709551615",
            Some("w1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_list_is_scoped_and_fails_closed() {
    let app = TestApp::new();
    app.create(json!({ "name": "Alpha", "workflowId": "w1" })).await;
    app.create(json!({ "name": "Beta", "workflowId": "w2" })).await;

    let (status, body) = app.request(Method::GET, "/test-definitions", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (_, body) = app
        .request(Method::GET, "/test-definitions", Some("w1,w2"), None)
        .await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["items"][0]["name"], "Beta");

    let (_, body) = app
        .request(Method::GET, "/test-definitions?name=alp&take=10", Some("w1,w2"), None)
        .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["name"], "Alpha");
}

#[tokio::test]
async fn test_delete() {
    let app = TestApp::new();
    let created = app.create(json!({ "name": "T1", "workflowId": "w1" })).await;
    let path = format!("/test-definitions/{}", created["id"]);

    let (status, _) = app.request(Method::DELETE, &path, Some("w2"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.request(Method::DELETE, &path, Some("w1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.request(Method::DELETE, &path, Some("w1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

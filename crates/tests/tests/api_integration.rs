use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use lectern_api::build_app_with_config;
use lectern_core::{ChunkingConfig, LecternConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "dev-lectern-key";

const NOTES: &str = "Photosynthesis converts light energy into chemical energy stored in glucose.\n\n\
Mitochondria are the powerhouse of the cell and produce ATP through cellular respiration.\n\n\
The cell membrane controls what enters and leaves the cell using selective transport proteins.\n\n\
Ribosomes read messenger RNA and assemble amino acids into proteins.";

async fn test_app() -> Router {
    let config = LecternConfig {
        chunking: ChunkingConfig::new(12, 2).expect("valid chunking config"),
        ..LecternConfig::default()
    };
    build_app_with_config(config)
        .await
        .expect("app should build")
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn upload_and_wait(app: &Router, title: &str, text: &str) -> String {
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/documents",
            Some(json!({ "title": title, "text": text })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(authed("GET", &format!("/v1/documents/{id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let document = read_json(response).await;
        if document["status"] == "ready" {
            return id;
        }
        assert_ne!(document["status"], "failed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("document {id} never became ready");
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["generator"], "extractive");
}

#[tokio::test]
async fn documents_require_api_key() {
    let app = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/documents")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "title": "Biology", "text": NOTES }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "unauthorized");
}

#[tokio::test]
async fn upload_search_chat_and_delete_flow() {
    let app = test_app().await;
    let id = upload_and_wait(&app, "Biology notes", NOTES).await;

    let response = app
        .clone()
        .oneshot(authed("GET", &format!("/v1/documents/{id}/chunks"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chunks = read_json(response).await;
    let chunks = chunks.as_array().unwrap();
    assert!(chunks.len() > 1);
    for (position, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk["chunkIndex"], position);
    }

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/documents/{id}/search"),
            Some(json!({ "query": "mitochondria powerhouse", "max_chunks": 2 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ranked = read_json(response).await;
    let ranked = ranked.as_array().unwrap();
    assert!(!ranked.is_empty() && ranked.len() <= 2);
    assert!(ranked[0]["content"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("mitochondria"));
    let scores = ranked
        .iter()
        .map(|hit| hit["score"].as_u64().unwrap())
        .collect::<Vec<_>>();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/documents/{id}/search"),
            Some(json!({ "query": "mitochondria", "max_chunks": -1 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!([]));

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/ai/chat",
            Some(json!({ "document_id": id, "question": "Which proteins do ribosomes assemble?" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let answer = read_json(response).await;
    assert!(!answer["relevant_chunks"].as_array().unwrap().is_empty());
    assert!(answer["answer"].as_str().unwrap().contains("Ribosomes"));

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/ai/explain-concept",
            Some(json!({ "document_id": id, "concept": "photosynthesis" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let explanation = read_json(response).await;
    assert_eq!(explanation["concept"], "photosynthesis");
    assert!(!explanation["relevant_chunks"].as_array().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(authed("GET", &format!("/v1/ai/chat/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = read_json(response).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "assistant");

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/documents", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert!(listed
        .as_array()
        .unwrap()
        .iter()
        .any(|summary| summary["id"] == id.as_str()));

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/v1/documents/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed("GET", &format!("/v1/documents/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/documents/missing/search",
            Some(json!({ "query": "anything" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(authed(
            "POST",
            "/v1/ai/chat",
            Some(json!({ "document_id": "missing", "question": "anything?" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "not_found");
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let app = test_app().await;
    let id = upload_and_wait(&app, "Short", "Enzymes speed up reactions.").await;

    let response = app
        .oneshot(authed(
            "POST",
            "/v1/ai/chat",
            Some(json!({ "document_id": id, "question": "   " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "invalid_request");
}

#[tokio::test]
async fn rename_and_summarize_document() {
    let app = test_app().await;
    let id = upload_and_wait(&app, "Biology notes", NOTES).await;

    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/v1/documents/{id}"),
            Some(json!({ "title": "Cell biology" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let renamed = read_json(response).await;
    assert_eq!(renamed["title"], "Cell biology");
    assert_eq!(renamed["status"], "ready");

    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/v1/documents/{id}"),
            Some(json!({ "title": "  " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/ai/generate-summary",
            Some(json!({ "document_id": id })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = read_json(response).await;
    assert_eq!(summary["document_id"], id.as_str());
    assert_eq!(summary["title"], "Cell biology");
    assert!(summary["summary"]
        .as_str()
        .unwrap()
        .starts_with("Photosynthesis converts light energy"));

    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            "/v1/documents/missing",
            Some(json!({ "title": "Anything" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(authed(
            "POST",
            "/v1/ai/generate-summary",
            Some(json!({ "document_id": "missing" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

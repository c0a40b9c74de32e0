//! Integration tests for source placement endpoints.

#[path = "helpers.rs"]
mod helpers;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_move_single_source() {
    let app = helpers::TestApp::new().await;
    let inbox = app.create_folder("Inbox", None).await;
    app.seed_source("s1", "Paper", None);

    let response = app
        .request(
            "PUT",
            "/api/sources/s1/folder",
            Some(json!({ "folder_id": inbox })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["count"], 1);
    assert_eq!(response.body["data"]["folder_id"], inbox.as_str());

    let response = app
        .request("GET", &format!("/api/folders/{inbox}"), None)
        .await;
    assert_eq!(response.body["data"]["source_count"], 1);

    let response = app
        .request("PUT", "/api/sources/s1/folder", Some(json!({ "folder_id": null })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app
        .request("GET", &format!("/api/folders/{inbox}"), None)
        .await;
    assert_eq!(response.body["data"]["source_count"], 0);
}

#[tokio::test]
async fn test_move_unknown_source_or_folder() {
    let app = helpers::TestApp::new().await;
    let inbox = app.create_folder("Inbox", None).await;
    app.seed_source("s1", "Paper", None);

    let response = app
        .request(
            "PUT",
            "/api/sources/ghost/folder",
            Some(json!({ "folder_id": inbox })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(
            "PUT",
            "/api/sources/s1/folder",
            Some(json!({ "folder_id": "00000000-0000-0000-0000-000000000042" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_move_sources() {
    let app = helpers::TestApp::new().await;
    let inbox = app.create_folder("Inbox", None).await;
    for id in ["a", "b", "c"] {
        app.seed_source(id, id, None);
    }

    let response = app
        .request(
            "POST",
            "/api/sources/move",
            Some(json!({ "source_ids": ["a", "b", "ghost"], "folder_id": inbox })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["count"], 2);
    assert_eq!(response.body["data"]["message"], "Moved 2 sources successfully");

    let response = app.request("GET", "/api/folders/tree", None).await;
    assert_eq!(response.body["data"]["tree"][0]["source_count"], 2);
    assert_eq!(response.body["data"]["total_sources"], 3);
}

#[tokio::test]
async fn test_batch_move_requires_ids() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/sources/move",
            Some(json!({ "source_ids": [], "folder_id": null })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

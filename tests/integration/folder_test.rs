//! Integration tests for folder endpoints.

#[path = "helpers.rs"]
mod helpers;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");

    let response = app.request("GET", "/api/health/detailed", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["store_backend"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/nothing-here", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_and_get_folder() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/folders",
            Some(json!({ "name": "  Research  ", "color": "#3b82f6", "icon": "book" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let data = &response.body["data"];
    assert_eq!(data["name"], "Research");
    assert_eq!(data["color"], "#3b82f6");
    assert_eq!(data["parent_id"], serde_json::Value::Null);
    assert_eq!(data["source_count"], 0);

    let id = data["id"].as_str().unwrap();
    let response = app.request("GET", &format!("/api/folders/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "Research");
}

#[tokio::test]
async fn test_create_folder_validation() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("POST", "/api/folders", Some(json!({ "name": "   " })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app
        .request("POST", "/api/folders", Some(json!({ "name": "a/b" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "POST",
            "/api/folders",
            Some(json!({ "name": "Ok", "color": "blue" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request("POST", "/api/folders", Some(json!({ "name": "a".repeat(256) })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_name_length_counts_after_trimming() {
    let app = helpers::TestApp::new().await;
    let name = "n".repeat(255);

    let response = app
        .request(
            "POST",
            "/api/folders",
            Some(json!({ "name": format!("  {name}  ") })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["name"], name.as_str());

    let id = response.body["data"]["id"].as_str().unwrap().to_string();
    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{id}"),
            Some(json!({ "name": format!(" {name}\t") })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], name.as_str());
}

#[tokio::test]
async fn test_create_under_missing_parent() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/folders",
            Some(json!({
                "name": "Orphan",
                "parent_id": "00000000-0000-0000-0000-000000000001"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_folder_id_is_bad_request() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/folders/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "GET",
            "/api/folders/00000000-0000-0000-0000-999999999999",
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_folders_by_parent() {
    let app = helpers::TestApp::new().await;
    let docs = app.create_folder("Docs", None).await;
    app.create_folder("Notes", None).await;
    app.create_folder("Rust", Some(&docs)).await;
    app.create_folder("Go", Some(&docs)).await;

    let response = app.request("GET", "/api/folders", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let roots = response.body["data"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["name"], "Docs");
    assert_eq!(roots[0]["subfolder_count"], 2);

    let response = app
        .request("GET", &format!("/api/folders?parent_id={docs}"), None)
        .await;
    let names: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Go", "Rust"]);
}

#[tokio::test]
async fn test_tree_with_counts_and_sources() {
    let app = helpers::TestApp::new().await;
    let docs = app.create_folder("Docs", None).await;
    let rust = app.create_folder("Rust", Some(&docs)).await;
    app.seed_source("s1", "The Book", Some(rust.parse().unwrap()));
    app.seed_source("s2", "Nomicon", Some(rust.parse().unwrap()));
    app.seed_source("s3", "Loose", None);

    let response = app.request("GET", "/api/folders/tree", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["total_folders"], 2);
    assert_eq!(data["total_sources"], 3);
    let root = &data["tree"][0];
    assert_eq!(root["name"], "Docs");
    assert_eq!(root["total_sources"], 2);
    assert_eq!(root["children"][0]["source_count"], 2);
    assert!(root["children"][0]["sources"].as_array().unwrap().is_empty());

    let response = app
        .request("GET", "/api/folders/tree?include_sources=true", None)
        .await;
    let sources = response.body["data"]["tree"][0]["children"][0]["sources"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["knowledge_type"], "technical");
}

#[tokio::test]
async fn test_update_folder() {
    let app = helpers::TestApp::new().await;
    let id = app.create_folder("Drafts", None).await;

    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{id}"),
            Some(json!({ "name": "Published", "position": 3 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "Published");
    assert_eq!(response.body["data"]["position"], 3);

    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{id}"),
            Some(json!({ "color": "#zzzzzz" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_move_folder_and_path() {
    let app = helpers::TestApp::new().await;
    let docs = app.create_folder("Docs", None).await;
    let notes = app.create_folder("Notes", None).await;
    let rust = app.create_folder("Rust", Some(&docs)).await;

    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{rust}/move"),
            Some(json!({ "new_parent_id": notes })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["parent_id"], notes.as_str());

    let response = app
        .request("GET", &format!("/api/folders/{rust}/path"), None)
        .await;
    assert_eq!(response.body["data"], json!(["Notes", "Rust"]));

    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{rust}/move"),
            Some(json!({ "new_parent_id": null })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["parent_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_move_folder_rejects_cycles() {
    let app = helpers::TestApp::new().await;
    let docs = app.create_folder("Docs", None).await;
    let rust = app.create_folder("Rust", Some(&docs)).await;

    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{docs}/move"),
            Some(json!({ "new_parent_id": rust })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "PUT",
            &format!("/api/folders/{docs}/move"),
            Some(json!({ "new_parent_id": docs })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_moves_contents_to_parent() {
    let app = helpers::TestApp::new().await;
    let docs = app.create_folder("Docs", None).await;
    let rust = app.create_folder("Rust", Some(&docs)).await;
    let async_ = app.create_folder("Async", Some(&rust)).await;
    app.seed_source("s1", "The Book", Some(rust.parse().unwrap()));

    let response = app
        .request("DELETE", &format!("/api/folders/{rust}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["moved_to_parent"], true);

    let response = app
        .request("GET", &format!("/api/folders/{async_}"), None)
        .await;
    assert_eq!(response.body["data"]["parent_id"], docs.as_str());

    let response = app
        .request("GET", &format!("/api/folders/{docs}/contents"), None)
        .await;
    let data = &response.body["data"];
    assert_eq!(data["sources"][0]["source_id"], "s1");
    assert_eq!(data["subfolders"][0]["name"], "Async");
    assert_eq!(data["path"], json!(["Docs"]));
}

#[tokio::test]
async fn test_delete_recursive() {
    let app = helpers::TestApp::new().await;
    let docs = app.create_folder("Docs", None).await;
    let rust = app.create_folder("Rust", Some(&docs)).await;
    app.create_folder("Async", Some(&rust)).await;

    let response = app
        .request(
            "DELETE",
            &format!("/api/folders/{docs}?move_contents_to_parent=false"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["folders_deleted"], 3);

    let response = app.request("GET", "/api/folders/tree", None).await;
    assert_eq!(response.body["data"]["total_folders"], 0);

    let response = app
        .request("DELETE", &format!("/api/folders/{docs}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

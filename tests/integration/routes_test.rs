//! Integration tests for routes and assets mounted by extensions.

mod helpers;

use axum::http::{StatusCode, header};
use serde_json::json;

const LINKS: &str = "/plugins/friend_links/api/links";

#[tokio::test]
async fn test_friend_link_crud() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;

    let created = app
        .post(
            LINKS,
            Some(json!({"name": "Tera", "url": "https://keats.github.io/tera", "sort_order": 95})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["data"]["id"], 4);

    let page = app.get("/").await.text;
    let rust = page.find("Rust").unwrap();
    let tera = page.find("Tera").unwrap();
    assert!(tera < rust, "sort order puts Tera above Rust");

    let updated = app
        .request("PUT", &format!("{LINKS}/4"), Some(json!({"active": false})))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["data"]["active"], false);
    assert!(!app.get("/").await.text.contains("Tera"));

    let deleted = app.request("DELETE", &format!("{LINKS}/4"), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(LINKS).await.json()["data"].as_array().unwrap().len(), 3);

    let missing = app.request("DELETE", &format!("{LINKS}/4"), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_friend_link_validation() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;

    let bad_url = app.post(LINKS, Some(json!({"name": "FTP", "url": "ftp://example.com"}))).await;
    assert_eq!(bad_url.status, StatusCode::BAD_REQUEST);

    let bad_id = app.request("PUT", &format!("{LINKS}/abc"), Some(json!({}))).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let not_json = app
        .request("POST", LINKS, None)
        .await;
    assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_method_not_allowed_lists_methods() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;

    let response = app.request("PATCH", LINKS, None).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    let allow = response.headers[header::ALLOW].to_str().unwrap();
    assert!(allow.contains("GET"));
    assert!(allow.contains("POST"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = helpers::TestApp::new().await;

    let response = app.get("/no/such/page").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_static_assets_served_while_active() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;

    let css = app.get("/static/plugins/friend_links/css/friend_links.css").await;
    assert_eq!(css.status, StatusCode::OK);
    assert!(css.text.contains("teal"));

    let missing = app.get("/static/plugins/friend_links/css/nope.css").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let bad_kind = app.get("/static/widgets/friend_links/css/friend_links.css").await;
    assert_eq!(bad_kind.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "noisy").await;

    let response = app.get("/noisy/panic").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "INTERNAL_ERROR");

    assert_eq!(app.get("/api/health").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_host_routes_win_over_extensions() {
    let app = helpers::TestApp::new().await;
    app.enable("theme", "paper").await;

    let health = app.get("/api/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json()["data"]["status"], "ok");

    let routes = app.get("/api/admin/routes").await.json();
    let paths: Vec<&str> = routes["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"/about"));
    assert!(paths.contains(&"/theme/whoami"));
}

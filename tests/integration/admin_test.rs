//! Integration tests for admin validation, configuration and hook
//! introspection.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_bad_paths_are_rejected() {
    let app = helpers::TestApp::new().await;

    let kind = app.get("/api/admin/extensions/widget/friend_links").await;
    assert_eq!(kind.status, StatusCode::BAD_REQUEST);
    assert_eq!(kind.json()["error"], "VALIDATION_ERROR");

    let id = app.get("/api/admin/extensions/plugin/no%20spaces").await;
    assert_eq!(id.status, StatusCode::BAD_REQUEST);

    let missing = app.get("/api/admin/extensions/plugin/nobody").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let filter = app.get("/api/admin/extensions?kind=widgets").await;
    assert_eq!(filter.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_out_of_order_transitions_conflict() {
    let app = helpers::TestApp::new().await;

    let early = app.post("/api/admin/extensions/plugin/friend_links/activate", None).await;
    assert_eq!(early.status, StatusCode::CONFLICT);
    assert_eq!(early.json()["error"], "INVALID_TRANSITION");

    let deactivate = app.post("/api/admin/extensions/plugin/friend_links/deactivate", None).await;
    assert_eq!(deactivate.status, StatusCode::CONFLICT);

    let config = app
        .request(
            "PUT",
            "/api/admin/extensions/plugin/friend_links/config",
            Some(json!({"title": "Pals"})),
        )
        .await;
    assert_eq!(config.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_config_hides_and_keeps_secrets() {
    let app = helpers::TestApp::new().await;
    let installed = app.post("/api/admin/extensions/plugin/noisy/install", None).await;
    assert_eq!(installed.status, StatusCode::OK);

    let config = app.get("/api/admin/extensions/plugin/noisy/config").await.json();
    assert_eq!(config["data"], json!({"greeting": "hi"}));

    let updated = app
        .request(
            "PUT",
            "/api/admin/extensions/plugin/noisy/config",
            Some(json!({"greeting": "hello", "api_key": ""})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["data"], json!({"greeting": "hello"}));

    let key = noteblog_entity::ExtensionKey::plugin("noisy");
    let stored = app.manager.config_store().get_config(&key).await.unwrap();
    assert_eq!(stored["api_key"], "s3cr3t");

    let not_a_map = app
        .request(
            "PUT",
            "/api/admin/extensions/plugin/noisy/config",
            Some(json!(["greeting"])),
        )
        .await;
    assert!(not_a_map.status.is_client_error());
}

#[tokio::test]
async fn test_failing_hook_does_not_break_page() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "noisy").await;

    let page = app.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.text.contains("<title>Noteblog (loud)</title>"));
    assert!(page.text.contains("noisy footer on home"));

    let failures = app.get("/api/admin/hooks/failures").await.json();
    let entry = &failures["data"][0];
    assert_eq!(entry["owner"], json!({"kind": "plugin", "id": "noisy"}));
    assert_eq!(entry["point"], "footer");
    assert_eq!(entry["failures"], 1);
}

#[tokio::test]
async fn test_hook_listing_follows_activation() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "noisy").await;

    let hooks = app.get("/api/admin/hooks").await.json();
    let footer: Vec<i64> = hooks["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|h| h["point"] == "footer")
        .map(|h| h["priority"].as_i64().unwrap())
        .collect();
    assert_eq!(footer, vec![1, 20]);

    app.post("/api/admin/extensions/plugin/noisy/deactivate", None).await;
    let hooks = app.get("/api/admin/hooks").await.json();
    assert!(hooks["data"].as_array().unwrap().is_empty());
    assert!(!app.get("/").await.text.contains("loud"));
}

#[tokio::test]
async fn test_rescan_picks_up_new_directory() {
    let app = helpers::TestApp::new().await;
    let late = app.root.path().join("themes").join("late");
    std::fs::create_dir_all(&late).unwrap();
    std::fs::write(late.join("theme.toml"), "entry = \"paper\"\nname = \"Late\"\n").unwrap();

    let scanned = app.post("/api/admin/extensions/discover", None).await;
    assert_eq!(scanned.status, StatusCode::OK);

    let late = app.get("/api/admin/extensions/theme/late").await.json();
    assert_eq!(late["data"]["display_name"], "Late");
    assert_eq!(late["data"]["state"], "discovered");
}

//! Integration tests for the extension lifecycle through the admin API.

mod helpers;

use axum::http::StatusCode;
use serde_json::Value;

fn find<'a>(list: &'a Value, kind: &str, id: &str) -> &'a Value {
    list["data"]
        .as_array()
        .and_then(|items| items.iter().find(|e| e["kind"] == kind && e["id"] == id))
        .unwrap_or_else(|| panic!("{kind}:{id} not listed in {list}"))
}

#[tokio::test]
async fn test_startup_discovers_everything_on_disk() {
    let app = helpers::TestApp::new().await;

    let response = app.get("/api/admin/extensions").await;
    assert_eq!(response.status, StatusCode::OK);
    let list = response.json();
    assert_eq!(list["data"].as_array().unwrap().len(), 5);

    let links = find(&list, "plugin", "friend_links");
    assert_eq!(links["state"], "discovered");
    assert_eq!(links["display_name"], "Friend Links");
    assert_eq!(links["install_path"], "plugins/friend_links");
    assert_eq!(links["live"], false);

    let ghost = find(&list, "plugin", "ghost");
    assert!(ghost["load_error"].as_str().unwrap().contains("not_compiled_in"));

    let paper = find(&list, "theme", "paper");
    assert_eq!(paper["version"], "2.0.0");

    let themes = app.get("/api/admin/extensions?kind=themes").await.json();
    assert_eq!(themes["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_activate_and_deactivate_friend_links() {
    let app = helpers::TestApp::new().await;

    let before = app.get("/").await;
    assert_eq!(before.status, StatusCode::OK);
    assert!(!before.text.contains("friend-links"));

    app.enable("plugins", "friend_links").await;

    let page = app.get("/").await;
    assert!(page.text.contains("Friend Links"));
    assert!(page.text.contains("GitHub"));
    assert!(page.text.contains("/static/plugins/friend_links/css/friend_links.css"));
    assert!(page.text.contains("/static/plugins/friend_links/js/friend_links.js"));

    let links = app.get("/plugins/friend_links/api/links").await;
    assert_eq!(links.status, StatusCode::OK);

    let deactivated = app
        .post("/api/admin/extensions/plugin/friend_links/deactivate", None)
        .await;
    assert_eq!(deactivated.status, StatusCode::OK);
    assert_eq!(deactivated.json()["data"]["state"], "inactive");

    assert!(!app.get("/").await.text.contains("friend-links"));
    assert_eq!(
        app.get("/plugins/friend_links/api/links").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get("/static/plugins/friend_links/css/friend_links.css").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_activate_twice_is_harmless() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;

    let again = app.post("/api/admin/extensions/plugin/friend_links/activate", None).await;
    assert_eq!(again.status, StatusCode::OK);

    let page = app.get("/").await;
    assert_eq!(page.text.matches("class=\"widget friend-links\"").count(), 1);
}

#[tokio::test]
async fn test_active_extensions_survive_restart() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;
    app.enable("theme", "paper").await;

    let app = app.restart().await;

    let page = app.get("/").await;
    assert!(page.text.contains("GitHub"));
    assert_eq!(app.get("/about").await.status, StatusCode::OK);

    let health = app.get("/api/health").await.json();
    assert_eq!(health["data"]["active_extensions"], 2);
}

#[tokio::test]
async fn test_uninstall_clears_configuration() {
    let app = helpers::TestApp::new().await;
    app.enable("plugin", "friend_links").await;

    let created = app
        .post(
            "/plugins/friend_links/api/links",
            Some(serde_json::json!({"name": "Axum", "url": "https://github.com/tokio-rs/axum"})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let removed = app
        .post("/api/admin/extensions/plugin/friend_links/uninstall", None)
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.json()["data"]["state"], "uninstalled");
    assert!(!app.get("/").await.text.contains("friend-links"));

    app.enable("plugin", "friend_links").await;
    let links = app.get("/plugins/friend_links/api/links").await.json();
    let names: Vec<&str> = links["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["GitHub", "Rust", "Tokio"]);
}

#[tokio::test]
async fn test_broken_plugin_cannot_be_installed() {
    let app = helpers::TestApp::new().await;

    let response = app.post("/api/admin/extensions/plugin/ghost/install", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["error"], "LOAD_ERROR");

    let ghost = app.get("/api/admin/extensions/plugin/ghost").await.json();
    assert_eq!(ghost["data"]["state"], "discovered");
}

#[tokio::test]
async fn test_one_theme_at_a_time() {
    let app = helpers::TestApp::new().await;

    app.enable("theme", "paper").await;
    let about = app.get("/about").await;
    assert_eq!(about.status, StatusCode::OK);
    assert!(about.text.contains("About Paper"));
    assert_eq!(app.get("/theme/whoami").await.text, "Paper");

    app.enable("theme", "ink").await;
    assert!(app.get("/about").await.text.contains("About Ink"));
    assert_eq!(app.get("/theme/whoami").await.text, "Ink");

    let paper = app.get("/api/admin/extensions/theme/paper").await.json();
    assert_eq!(paper["data"]["state"], "inactive");
    assert_eq!(paper["data"]["live"], false);
}

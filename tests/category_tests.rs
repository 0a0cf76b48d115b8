mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_categories_require_auth() {
    let app = TestApp::new().await;

    let (status, _) = app.request("GET", "/api/categories", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_includes_global_categories() {
    let app = TestApp::new().await;
    let (_, access, _) = app.signed_in_user("alice@example.com").await;

    let (status, body) = app.get_authed("/api/categories", &access).await;

    assert_eq!(status, StatusCode::OK);
    let categories = body["categories"].as_array().unwrap();
    assert!(
        categories
            .iter()
            .any(|c| c["name"] == "Salary" && c["user_id"].is_null())
    );
}

#[tokio::test]
async fn test_category_crud() {
    let app = TestApp::new().await;
    let (user_id, access, _) = app.signed_in_user("alice@example.com").await;

    let (status, body) = app
        .request(
            "POST",
            "/api/categories",
            Some(json!({ "name": "Rent", "kind": "expense", "icon": "house" })),
            Some(&access),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();
    let uri = format!("/api/categories/{}", id);

    let (status, body) = app.get_authed(&uri, &access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Rent");
    assert_eq!(body["kind"], "expense");
    assert_eq!(body["icon"], "house");
    assert_eq!(body["user_id"], user_id);

    let (status, _) = app
        .request("PUT", &uri, Some(json!({ "name": "Housing" })), Some(&access))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get_authed(&uri, &access).await;
    assert_eq!(body["name"], "Housing");
    assert_eq!(body["icon"], "house");

    let (status, _) = app.request("DELETE", &uri, None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get_authed(&uri, &access).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_categories_are_private() {
    let app = TestApp::new().await;
    let (_, alice, _) = app.signed_in_user("alice@example.com").await;
    let (_, bob, _) = app.signed_in_user("bob@example.com").await;

    let (_, body) = app
        .request(
            "POST",
            "/api/categories",
            Some(json!({ "name": "Rent", "kind": "expense" })),
            Some(&alice),
        )
        .await;
    let uri = format!("/api/categories/{}", body["id"]);

    let (status, _) = app.get_authed(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("PUT", &uri, Some(json!({ "name": "Mine" })), Some(&bob))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.request("DELETE", &uri, None, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get_authed(&uri, &alice).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_global_categories_are_read_only() {
    let app = TestApp::new().await;
    let (_, access, _) = app.signed_in_user("alice@example.com").await;
    let (_, body) = app.get_authed("/api/categories", &access).await;
    let global = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["user_id"].is_null())
        .unwrap()
        .clone();
    let uri = format!("/api/categories/{}", global["id"]);

    let (status, _) = app.get_authed(&uri, &access).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("PUT", &uri, Some(json!({ "name": "Mine" })), Some(&access))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.request("DELETE", &uri, None, Some(&access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_validation() {
    let app = TestApp::new().await;
    let (_, access, _) = app.signed_in_user("alice@example.com").await;

    for body in [
        json!({ "name": "", "kind": "expense" }),
        json!({ "name": "Rent", "kind": "transfer" }),
        json!({ "name": "x".repeat(65), "kind": "income" }),
        json!({ "kind": "income" }),
    ] {
        let (status, response) = app
            .request("POST", "/api/categories", Some(body.clone()), Some(&access))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", body);
        assert!(response["error"].is_string());
    }

    let (status, _) = app.get_authed("/api/categories/abc", &access).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request("PUT", "/api/categories/1", Some(json!({})), Some(&access))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

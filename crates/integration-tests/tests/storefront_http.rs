//! HTTP tests against the assembled storefront router.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use prostore_core::{Email, Role, UserId};
use prostore_integration_tests::{body_string, signed_in_cookie, test_app, test_app_with};
use prostore_storefront::db::MemoryStore as StorefrontStore;
use prostore_storefront::models::IdentityToken;

fn cart_set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sessionCartId="))
        .map(str::to_owned)
}

fn jane() -> IdentityToken {
    IdentityToken {
        sub: Some(UserId::generate()),
        role: Some(Role::User),
        name: Some("jane".to_owned()),
        email: Some(Email::parse("jane@example.com").unwrap()),
    }
}

#[tokio::test]
async fn test_health_skips_guard() {
    let response = test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cart_set_cookie(&response).is_none());
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_signed_out_session_is_null_and_mints_cart_cookie() {
    let response = test_app()
        .oneshot(Request::get("/api/auth/session").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cart_set_cookie(&response).unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert_eq!(body_string(response).await, "null");
}

#[tokio::test]
async fn test_signed_out_protected_page_redirects_to_sign_in() {
    let response = test_app()
        .oneshot(Request::get("/profile").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/sign-in?callbackUrl=%2Fprofile"
    );
    assert!(cart_set_cookie(&response).is_some());
}

#[tokio::test]
async fn test_signed_out_profile_update_is_denied_by_guard() {
    let response = test_app()
        .oneshot(
            Request::post("/user/profile")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Jane"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/sign-in?callbackUrl=%2Fuser%2Fprofile"
    );
}

#[tokio::test]
async fn test_signed_out_session_update_is_unauthorized() {
    let response = test_app()
        .oneshot(
            Request::post("/api/auth/session")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Janet"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_path_is_allowed() {
    let response = test_app()
        .oneshot(Request::get("/products").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // No handler, but the guard let it through.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(cart_set_cookie(&response).is_some());
}

#[tokio::test]
async fn test_existing_cart_cookie_is_not_reminted() {
    let response = test_app()
        .oneshot(
            Request::get("/api/auth/session")
                .header(COOKIE, "sessionCartId=5b7c2a4e-existing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cart_set_cookie(&response).is_none());
}

#[tokio::test]
async fn test_signed_in_visitor_passes_guard() {
    let sessions = MemoryStore::default();
    let cookie = signed_in_cookie(&sessions, &jane()).await;

    let response = test_app_with(sessions, StorefrontStore::new())
        .oneshot(
            Request::get("/profile")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signed_in_session_view() {
    let sessions = MemoryStore::default();
    let token = jane();
    let cookie = signed_in_cookie(&sessions, &token).await;

    let response = test_app_with(sessions, StorefrontStore::new())
        .oneshot(
            Request::get("/api/auth/session")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["user"]["id"], token.sub.unwrap().to_string());
    assert_eq!(body["user"]["name"], "jane");
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["role"], "user");
}

#[tokio::test]
async fn test_session_update_overrides_name() {
    let sessions = MemoryStore::default();
    let cookie = signed_in_cookie(&sessions, &jane()).await;
    let app = test_app_with(sessions, StorefrontStore::new());

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/auth/session")
                .header(COOKIE, cookie.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Janet"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["user"]["name"], "Janet");

    let response = app
        .oneshot(
            Request::get("/api/auth/session")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["user"]["name"], "Janet");
}

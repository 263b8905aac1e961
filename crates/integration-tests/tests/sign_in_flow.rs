//! Sign-in, sign-up, profile and cart endpoints against in-memory stores.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION},
    },
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use prostore_core::{Email, Role, SessionCartId, UserId};
use prostore_integration_tests::{
    body_string, seed_user, set_cookie_value, signed_in_cookie, test_app_with,
};
use prostore_storefront::db::{CartStore, MemoryStore as StorefrontStore};
use prostore_storefront::middleware::{CART_COOKIE_NAME, SESSION_COOKIE_NAME};
use prostore_storefront::models::{IdentityToken, NewCart, User};

const PASSWORD: &str = "correct-horse";

struct Harness {
    app: Router,
    sessions: MemoryStore,
    store: StorefrontStore,
}

impl Harness {
    fn new() -> Self {
        let sessions = MemoryStore::default();
        let store = StorefrontStore::new();
        Self {
            app: test_app_with(sessions.clone(), store.clone()),
            sessions,
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn sign_in(&self, email: &str, password: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::post("/sign-in")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let body = format!(
            "email={}&password={}",
            urlencode(email),
            urlencode(password)
        );
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    async fn session_json(&self, session_cookie: &str) -> Value {
        let response = self
            .send(
                Request::get("/api/auth/session")
                    .header(COOKIE, session_cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        serde_json::from_str(&body_string(response).await).unwrap()
    }
}

fn urlencode(value: &str) -> String {
    value.replace('@', "%40")
}

fn token_for(user: &User) -> IdentityToken {
    IdentityToken {
        sub: Some(user.id),
        role: Some(user.role),
        name: user.name.clone(),
        email: Some(user.email.clone()),
    }
}

#[tokio::test]
async fn test_sign_in_without_cart_cookie_creates_cart_for_minted_id() {
    let h = Harness::new();
    let user = seed_user(&h.store, "jane@example.com", None, PASSWORD).await;

    let response = h.sign_in("jane@example.com", PASSWORD, None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/");

    let minted = set_cookie_value(&response, CART_COOKIE_NAME).unwrap();
    let session_id = set_cookie_value(&response, SESSION_COOKIE_NAME).unwrap();

    let owned = h.store.carts_owned_by(user.id).await;
    assert_eq!(owned.len(), 1);
    assert!(owned[0].is_empty());
    assert_eq!(
        owned[0].session_cart_id.as_ref().map(SessionCartId::as_str),
        Some(minted.as_str())
    );

    // The derived name was persisted and is on the new session.
    assert_eq!(h.store.user(user.id).await.unwrap().name.as_deref(), Some("jane"));
    let session = h
        .session_json(&format!("{SESSION_COOKIE_NAME}={session_id}"))
        .await;
    assert_eq!(session["user"]["id"], user.id.to_string());
    assert_eq!(session["user"]["name"], "jane");
}

#[tokio::test]
async fn test_sign_in_adopts_anonymous_cart_from_cookie() {
    let h = Harness::new();
    let user = seed_user(&h.store, "jane@example.com", Some("Jane"), PASSWORD).await;
    let session_cart_id = SessionCartId::generate();
    let anonymous = h
        .store
        .create(NewCart::anonymous(session_cart_id.clone()))
        .await
        .unwrap();
    let stale = h
        .store
        .create(NewCart::for_user(user.id, None))
        .await
        .unwrap();

    let response = h
        .sign_in(
            "jane@example.com",
            PASSWORD,
            Some(&format!("{CART_COOKIE_NAME}={session_cart_id}")),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie_value(&response, CART_COOKIE_NAME).is_none());

    let owned = h.store.carts_owned_by(user.id).await;
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, anonymous.id);
    assert!(h.store.cart(stale.id).await.is_none());
}

#[tokio::test]
async fn test_sign_in_cycles_session_id() {
    let h = Harness::new();
    seed_user(&h.store, "jane@example.com", Some("Jane"), PASSWORD).await;
    let before = signed_in_cookie(&h.sessions, &IdentityToken::default()).await;

    let response = h.sign_in("jane@example.com", PASSWORD, Some(&before)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let after = set_cookie_value(&response, SESSION_COOKIE_NAME).unwrap();
    assert_ne!(format!("{SESSION_COOKIE_NAME}={after}"), before);
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_redirects_back() {
    let h = Harness::new();
    let user = seed_user(&h.store, "jane@example.com", Some("Jane"), PASSWORD).await;

    let response = h.sign_in("jane@example.com", "wrong-password", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/sign-in?error=credentials"
    );
    assert!(h.store.carts_owned_by(user.id).await.is_empty());
    assert!(h.store.carts().await.is_empty());
}

#[tokio::test]
async fn test_sign_up_creates_user_and_cart() {
    let h = Harness::new();

    let response = h
        .send(
            Request::post("/sign-up")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "email=new%40example.com&password={PASSWORD}&confirmPassword={PASSWORD}"
                )))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    let minted = set_cookie_value(&response, CART_COOKIE_NAME).unwrap();
    let session_id = set_cookie_value(&response, SESSION_COOKIE_NAME).unwrap();

    let session = h
        .session_json(&format!("{SESSION_COOKIE_NAME}={session_id}"))
        .await;
    assert_eq!(session["user"]["email"], "new@example.com");
    assert_eq!(session["user"]["name"], "new");

    let carts = h.store.carts().await;
    assert_eq!(carts.len(), 1);
    assert_eq!(
        carts[0].session_cart_id.as_ref().map(SessionCartId::as_str),
        Some(minted.as_str())
    );
    assert!(carts[0].user_id.is_some());
}

#[tokio::test]
async fn test_sign_up_password_mismatch_redirects_with_code() {
    let h = Harness::new();

    let response = h
        .send(
            Request::post("/sign-up")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "email=new%40example.com&password={PASSWORD}&confirmPassword=other-horse"
                )))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/sign-up?error=password_mismatch"
    );
    assert!(h.store.carts().await.is_empty());
}

#[tokio::test]
async fn test_profile_update_persists_name_and_refreshes_session() {
    let h = Harness::new();
    let user = seed_user(&h.store, "jane@example.com", Some("jane"), PASSWORD).await;
    let cookie = signed_in_cookie(&h.sessions, &token_for(&user)).await;

    let response = h
        .send(
            Request::post("/user/profile")
                .header(COOKIE, cookie.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"  Jane Doe "}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["user"]["name"], "Jane Doe");
    assert_eq!(
        h.store.user(user.id).await.unwrap().name.as_deref(),
        Some("Jane Doe")
    );
    assert_eq!(h.session_json(&cookie).await["user"]["name"], "Jane Doe");
}

#[tokio::test]
async fn test_profile_update_for_deleted_account_is_not_found() {
    let h = Harness::new();
    let token = IdentityToken {
        sub: Some(UserId::generate()),
        role: Some(Role::User),
        name: Some("ghost".to_owned()),
        email: Some(Email::parse("ghost@example.com").unwrap()),
    };
    let cookie = signed_in_cookie(&h.sessions, &token).await;

    let response = h
        .send(
            Request::post("/user/profile")
                .header(COOKIE, cookie)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Ghost"}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_endpoint_follows_identity() {
    let h = Harness::new();
    let user = seed_user(&h.store, "jane@example.com", Some("Jane"), PASSWORD).await;
    let owned = h
        .store
        .create(NewCart::for_user(user.id, None))
        .await
        .unwrap();
    let session_cart_id = SessionCartId::generate();
    let anonymous = h
        .store
        .create(NewCart::anonymous(session_cart_id.clone()))
        .await
        .unwrap();
    let session_cookie = signed_in_cookie(&h.sessions, &token_for(&user)).await;

    let signed_in: Value = serde_json::from_str(
        &body_string(
            h.send(
                Request::get("/api/cart")
                    .header(
                        COOKIE,
                        format!("{session_cookie}; {CART_COOKIE_NAME}={session_cart_id}"),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await,
        )
        .await,
    )
    .unwrap();
    assert_eq!(signed_in["id"], owned.id.to_string());

    let signed_out: Value = serde_json::from_str(
        &body_string(
            h.send(
                Request::get("/api/cart")
                    .header(COOKIE, format!("{CART_COOKIE_NAME}={session_cart_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await,
        )
        .await,
    )
    .unwrap();
    assert_eq!(signed_out["id"], anonymous.id.to_string());

    let fresh = h
        .send(Request::get("/api/cart").body(Body::empty()).unwrap())
        .await;
    assert_eq!(body_string(fresh).await, "null");
}

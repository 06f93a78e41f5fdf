//! Integration tests: build the router over in-memory stores and drive the
//! auth endpoints in-process, with authentication enabled and disabled side by side.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use storefront_api::config::ApiConfig;
use storefront_api::{AppState, router, router_with};
use storefront_core::auth::credentials::CredentialStore;
use storefront_core::auth::identity::Identity;
use storefront_core::auth::jwt::TokenCodec;
use storefront_core::auth::memory::{MemoryCredentialStore, MemoryRevocationStore};
use storefront_core::auth::revocation::RevocationStore;
use storefront_core::auth::{AuthMode, DEFAULT_USER_ID};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    app: Router,
    state: AppState,
    users: Arc<MemoryCredentialStore>,
    revocations: Arc<MemoryRevocationStore>,
}

fn state_for(mode: AuthMode) -> (AppState, Arc<MemoryCredentialStore>, Arc<MemoryRevocationStore>) {
    let users = Arc::new(MemoryCredentialStore::new());
    let revocations = Arc::new(MemoryRevocationStore::new());
    let mut config = ApiConfig::new(mode, SECRET);
    config.secure_cookies = false;
    let state = AppState::new(config, users.clone(), revocations.clone());
    (state, users, revocations)
}

fn test_app(mode: AuthMode) -> TestApp {
    let (state, users, revocations) = state_for(mode);
    TestApp {
        app: router(state.clone()),
        state,
        users,
        revocations,
    }
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    json: serde_json::Value,
}

impl Reply {
    /// Session token from `Set-Cookie: token=...`, if one was set.
    fn token(&self) -> Option<String> {
        let cookie = self.set_cookie.as_deref()?;
        let value = cookie.strip_prefix("token=")?.split(';').next()?;
        (!value.is_empty()).then(|| value.to_string())
    }
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    dispatch(app, req).await
}

/// Posts `body` verbatim, with an optional content type.
async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &str) -> Reply {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    dispatch(app, req).await
}

async fn dispatch(app: &Router, req: Request<Body>) -> Reply {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    Reply {
        status,
        set_cookie,
        json,
    }
}

async fn register(app: &Router, email: &str, password: &str) -> Reply {
    send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> Reply {
    send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await
}

async fn profile(app: &Router, token: Option<&str>) -> Reply {
    send(app, "GET", "/api/auth/profile", token, None).await
}

async fn logout(app: &Router, token: Option<&str>) -> Reply {
    send(app, "POST", "/api/auth/logout", token, None).await
}

#[tokio::test]
async fn register_then_login_resolve_the_same_subject() {
    let t = test_app(AuthMode::Enabled);

    let reg = register(&t.app, "A@X.com", "secret1").await;
    assert_eq!(reg.status, StatusCode::CREATED);
    assert_eq!(reg.json["email"], "a@x.com");
    let id = reg.json["id"].as_str().expect("id").to_string();
    let reg_token = reg.token().expect("register sets cookie");

    let me = profile(&t.app, Some(reg_token.as_str())).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["id"], id.as_str());

    let log = login(&t.app, "a@x.com", "secret1").await;
    assert_eq!(log.status, StatusCode::OK);
    assert_eq!(log.json["id"], id.as_str());
    let login_token = log.token().expect("login sets cookie");

    let me = profile(&t.app, Some(login_token.as_str())).await;
    assert_eq!(me.json, serde_json::json!({ "id": id, "email": "a@x.com" }));
}

#[tokio::test]
async fn session_cookie_attributes() {
    let t = test_app(AuthMode::Enabled);
    let reg = register(&t.app, "a@x.com", "secret1").await;
    let cookie = reg.set_cookie.expect("cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let t = test_app(AuthMode::Enabled);
    assert_eq!(register(&t.app, "a@x.com", "secret1").await.status, StatusCode::CREATED);

    let again = register(&t.app, "a@x.com", "secret2").await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.json["error"], "duplicate_email");
    assert!(again.token().is_none());

    let upper = register(&t.app, "A@x.COM", "secret2").await;
    assert_eq!(upper.json["error"], "duplicate_email");
}

#[tokio::test]
async fn invalid_credentials_do_not_reveal_which_part_was_wrong() {
    let t = test_app(AuthMode::Enabled);
    register(&t.app, "a@x.com", "secret1").await;

    let wrong_password = login(&t.app, "a@x.com", "wrong").await;
    let unknown_email = login(&t.app, "nouser@x.com", "anything").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json["error"], "invalid_credentials");
    assert_eq!(wrong_password.json, unknown_email.json);
    assert!(wrong_password.token().is_none());
}

#[tokio::test]
async fn registration_input_is_validated() {
    let t = test_app(AuthMode::Enabled);

    let short = register(&t.app, "a@x.com", "12345").await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.json["error"], "validation_error");

    let bad_email = register(&t.app, "not-an-email", "secret1").await;
    assert_eq!(bad_email.json["error"], "validation_error");

    let missing = send(
        &t.app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json["error"], "validation_error");

    let missing_login = send(
        &t.app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "email": "a@x.com" })),
    )
    .await;
    assert_eq!(missing_login.json["error"], "validation_error");
}

#[tokio::test]
async fn logout_revokes_the_token_before_it_expires() {
    let t = test_app(AuthMode::Enabled);
    let token = register(&t.app, "a@x.com", "secret1")
        .await
        .token()
        .expect("token");

    let out = logout(&t.app, Some(token.as_str())).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.json["message"], "Logged out successfully");
    let cleared = out.set_cookie.expect("clearing cookie");
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(t.revocations.len(), 1);

    // The token itself is still within its validity window.
    assert!(t.state.codec.verify(&token).is_some());

    let me = profile(&t.app, Some(token.as_str())).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.json["error"], "unauthenticated");

    // Revoked token no longer counts as signed in, so login is allowed again.
    let again = send(
        &t.app,
        "POST",
        "/api/auth/login",
        Some(token.as_str()),
        Some(serde_json::json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn revocation_record_expiry_matches_token_expiry() {
    let t = test_app(AuthMode::Enabled);
    let token = register(&t.app, "a@x.com", "secret1")
        .await
        .token()
        .expect("token");
    let exp = t.state.codec.decode_expiry(&token).expect("exp");

    logout(&t.app, Some(token.as_str())).await;

    // Not purgeable one second before expiry, purged right after.
    let before = t.revocations.purge_expired(exp - Duration::seconds(1)).await;
    assert_eq!(before.unwrap(), 0);
    let after = t.revocations.purge_expired(exp + Duration::seconds(1)).await;
    assert_eq!(after.unwrap(), 1);
}

#[tokio::test]
async fn gating_policies_when_enabled() {
    let t = test_app(AuthMode::Enabled);
    let token = register(&t.app, "a@x.com", "secret1")
        .await
        .token()
        .expect("token");

    let while_signed_in = send(
        &t.app,
        "POST",
        "/api/auth/register",
        Some(token.as_str()),
        Some(serde_json::json!({ "email": "b@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(while_signed_in.status, StatusCode::BAD_REQUEST);
    assert_eq!(while_signed_in.json["error"], "already_authenticated");

    let anon_profile = profile(&t.app, None).await;
    assert_eq!(anon_profile.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anon_profile.json["error"], "unauthenticated");

    let anon_logout = logout(&t.app, None).await;
    assert_eq!(anon_logout.status, StatusCode::UNAUTHORIZED);

    let garbage = profile(&t.app, Some("not.a.jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_and_foreign_tokens_count_as_no_credential() {
    let t = test_app(AuthMode::Enabled);
    let user = register(&t.app, "a@x.com", "secret1").await;
    let id = user.json["id"].as_str().unwrap().to_string();

    let expired = t
        .state
        .codec
        .issue_at(&id, "a@x.com", Utc::now() - Duration::days(8))
        .unwrap();
    let me = profile(&t.app, Some(expired.token.as_str())).await;
    assert_eq!(me.json["error"], "unauthenticated");

    let foreign = TokenCodec::new(b"a-different-secret")
        .issue(&id, "a@x.com")
        .unwrap();
    let me = profile(&t.app, Some(foreign.token.as_str())).await;
    assert_eq!(me.json["error"], "unauthenticated");

    // An expired token lets the caller log in again.
    let relog = send(
        &t.app,
        "POST",
        "/api/auth/login",
        Some(expired.token.as_str()),
        Some(serde_json::json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(relog.status, StatusCode::OK);
}

#[tokio::test]
async fn profile_of_removed_user_is_unauthenticated() {
    let t = test_app(AuthMode::Enabled);
    let reg = register(&t.app, "a@x.com", "secret1").await;
    let token = reg.token().expect("token");

    t.users.remove_user(reg.json["id"].as_str().unwrap());

    let me = profile(&t.app, Some(token.as_str())).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.json["error"], "unauthenticated");
}

#[tokio::test]
async fn disabled_mode_refuses_every_session_operation() {
    let t = test_app(AuthMode::Disabled);

    let reg = register(&t.app, "a@x.com", "secret1").await;
    assert_eq!(reg.status, StatusCode::BAD_REQUEST);
    assert_eq!(reg.json["error"], "auth_disabled");
    assert!(reg.token().is_none());

    let log = login(&t.app, "a@x.com", "secret1").await;
    assert_eq!(log.json["error"], "auth_disabled");

    // Gates pass unconditionally, so the operation itself answers.
    let out = logout(&t.app, None).await;
    assert_eq!(out.json["error"], "auth_disabled");

    let me = profile(&t.app, None).await;
    assert_eq!(me.json["error"], "auth_disabled");

    assert!(t.users.find_user_by_email("a@x.com").await.unwrap().is_none());
    assert!(t.revocations.is_empty());
}

#[tokio::test]
async fn unreadable_bodies_get_a_json_validation_error() {
    let t = test_app(AuthMode::Enabled);

    for uri in ["/api/auth/register", "/api/auth/login"] {
        let no_type = send_raw(&t.app, uri, None, "").await;
        assert_eq!(no_type.status, StatusCode::BAD_REQUEST);
        assert_eq!(no_type.json["error"], "validation_error");

        let malformed = send_raw(&t.app, uri, Some("application/json"), "{").await;
        assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
        assert_eq!(malformed.json["error"], "validation_error");

        let wrong_shape =
            send_raw(&t.app, uri, Some("application/json"), r#"{"email":5,"password":"secret1"}"#)
                .await;
        assert_eq!(wrong_shape.status, StatusCode::BAD_REQUEST);
        assert_eq!(wrong_shape.json["error"], "validation_error");
        assert!(wrong_shape.token().is_none());
    }

    assert!(t.users.find_user_by_email("5").await.unwrap().is_none());
}

#[tokio::test]
async fn disabled_mode_wins_over_an_unreadable_body() {
    let t = test_app(AuthMode::Disabled);

    for uri in ["/api/auth/register", "/api/auth/login"] {
        let no_type = send_raw(&t.app, uri, None, "").await;
        assert_eq!(no_type.status, StatusCode::BAD_REQUEST);
        assert_eq!(no_type.json["error"], "auth_disabled");

        let malformed = send_raw(&t.app, uri, Some("application/json"), "{").await;
        assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
        assert_eq!(malformed.json["error"], "auth_disabled");
    }
}

async fn whoami(Extension(identity): Extension<Identity>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "userId": identity.user_id() }))
}

#[tokio::test]
async fn storefront_routes_see_the_resolved_identity_in_both_modes() {
    let (enabled, _, _) = state_for(AuthMode::Enabled);
    let (disabled, _, _) = state_for(AuthMode::Disabled);
    let storefront = || Router::new().route("/api/whoami", get(whoami));
    let enabled_app = router_with(enabled, storefront());
    let disabled_app = router_with(disabled, storefront());

    let token = register(&enabled_app, "a@x.com", "secret1")
        .await
        .token()
        .expect("token");

    let anon = send(&enabled_app, "GET", "/api/whoami", None, None).await;
    assert_eq!(anon.json["userId"], serde_json::Value::Null);

    let signed_in = send(&enabled_app, "GET", "/api/whoami", Some(token.as_str()), None).await;
    assert!(signed_in.json["userId"].is_string());
    assert_ne!(signed_in.json["userId"], DEFAULT_USER_ID);

    // The same token means nothing to the disabled instance.
    for token in [None, Some(token.as_str())] {
        let reply = send(&disabled_app, "GET", "/api/whoami", token, None).await;
        assert_eq!(reply.json["userId"], DEFAULT_USER_ID);
    }
}

//! End-to-end tests for the auth flow and the protected routes

mod common;

use common::{spawn_app, TEST_SECRET};

use bookwarden::auth::TokenService;
use bookwarden::models::Role;
use reqwest::StatusCode;
use serde_json::json;

// Test 1: Health endpoint is open and reports the package version
#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// Test 2: Signup, login, validate round trip through the session cookie
#[tokio::test]
async fn test_signup_login_validate() {
    let app = spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&json!({ "email": "alice@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("Authorization="));
    assert!(set_cookie.contains("HttpOnly"));

    // The cookie store now carries the session token
    let resp = app
        .client
        .get(app.url("/auth/validate"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"]["password_hash"].is_null());
}

// Test 3: Validate without a credential is a single undifferentiated 401
#[tokio::test]
async fn test_validate_without_credential() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(app.url("/auth/validate"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

// Test 4: Duplicate signup is rejected
#[tokio::test]
async fn test_duplicate_signup() {
    let app = spawn_app().await;
    let creds = json!({ "email": "bob@example.com", "password": "pw123456" });

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&creds)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&creds)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// Test 5: Unknown email and wrong password produce the same login error
#[tokio::test]
async fn test_login_failures_indistinguishable() {
    let app = spawn_app().await;
    app.seed_user("carol@example.com", "right-password", Role::User)
        .await;

    let wrong_password = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "carol@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    let unknown_email = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email.status(), StatusCode::BAD_REQUEST);

    let a: serde_json::Value = wrong_password.json().await.unwrap();
    let b: serde_json::Value = unknown_email.json().await.unwrap();
    assert_eq!(a["error"], b["error"]);
}

// Test 6: Books CRUD over an authenticated session
#[tokio::test]
async fn test_books_crud() {
    let app = spawn_app().await;
    app.seed_user("dave@example.com", "pw123456", Role::User)
        .await;
    app.client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "dave@example.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .post(app.url("/api/books"))
        .json(&json!({
            "title": "The Rust Programming Language",
            "author": "Klabnik & Nichols",
            "category": "programming",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    let id = body["book"]["id"].as_i64().unwrap();

    let resp = app
        .client
        .get(app.url(&format!("/api/books/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .patch(app.url(&format!("/api/books/{}", id)))
        .json(&json!({ "category": "reference" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["book"]["category"], "reference");
    assert_eq!(body["book"]["title"], "The Rust Programming Language");

    let resp = app
        .client
        .delete(app.url(&format!("/api/books/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .get(app.url(&format!("/api/books/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// Test 7: Book routes without a session are 401
#[tokio::test]
async fn test_books_require_auth() {
    let app = spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/books"))
        .json(&json!({ "title": "t", "author": "a", "category": "c" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .client
        .get(app.url("/api/books/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// Test 8: Admin routes reject a regular user with 403, admit an admin
#[tokio::test]
async fn test_admin_role_enforced() {
    let app = spawn_app().await;
    app.seed_user("eve@example.com", "pw123456", Role::User).await;
    app.client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "eve@example.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    // A second session as an admin
    let admin_app = spawn_app().await;
    admin_app
        .seed_user("root@example.com", "pw123456", Role::Admin)
        .await;
    admin_app
        .client
        .post(admin_app.url("/auth/login"))
        .json(&json!({ "email": "root@example.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap();

    let resp = admin_app
        .client
        .get(admin_app.url("/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["users"].as_array().unwrap().len(), 1);

    let resp = admin_app
        .client
        .get(admin_app.url("/admin/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// Test 9: A token signed with the wrong key is rejected like any other
// bad credential
#[tokio::test]
async fn test_forged_token_rejected() {
    let app = spawn_app().await;
    let user = app
        .seed_user("frank@example.com", "pw123456", Role::User)
        .await;

    let forged = TokenService::new("not-the-real-secret-aaaaaaaaaaaaaaaa", 24, 0)
        .issue(&user.id.to_string())
        .unwrap();

    let resp = app
        .client
        .get(app.url("/auth/validate"))
        .header(reqwest::header::COOKIE, format!("Authorization={}", forged))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

// Test 10: A valid token whose user no longer exists gets the same 401
#[tokio::test]
async fn test_token_for_missing_user_rejected() {
    let app = spawn_app().await;

    let orphan = TokenService::new(TEST_SECRET, 24, 0).issue("9999").unwrap();

    let resp = app
        .client
        .get(app.url("/auth/validate"))
        .header(reqwest::header::COOKIE, format!("Authorization={}", orphan))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

// Test 11: Logout clears the cookie on the client
#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = spawn_app().await;
    app.seed_user("grace@example.com", "pw123456", Role::User)
        .await;
    app.client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "grace@example.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    // The emptied cookie no longer authenticates
    let resp = app
        .client
        .get(app.url("/auth/validate"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// Test 12: Signup rejects empty credentials
#[tokio::test]
async fn test_signup_empty_fields() {
    let app = spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&json!({ "email": "", "password": "pw123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&json!({ "email": "x@example.com", "password": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

//! Tests for signup, signin and the authenticated principal endpoints.

use authgate::{
    ServerConfig, create_app,
    db::Database,
    jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, JwtConfig},
    password,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

const ACCESS_SECRET: &[u8] = b"test-access-secret-key";
const REFRESH_SECRET: &[u8] = b"test-refresh-secret-key";

/// Create a test app and return (app, db, jwt_config).
async fn create_test_app() -> (axum::Router, Database, JwtConfig) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let jwt_config = JwtConfig::new(
        ACCESS_SECRET,
        REFRESH_SECRET,
        DEFAULT_ACCESS_TTL_SECS,
        DEFAULT_REFRESH_TTL_SECS,
    );
    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
        refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
        secure_cookies: false,
        cors_origins: vec!["http://localhost:5173".to_string()],
    };
    (create_app(&config), db, jwt_config)
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn signup(
    app: &axum::Router,
    email: &str,
    name: &str,
    password: &str,
) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(json_request(
            "/api/auth/signup",
            serde_json::json!({ "email": email, "name": name, "password": password }),
        ))
        .await
        .unwrap()
}

async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
fn extract_set_cookies(response: &axum::http::Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Pull the refresh token value out of a Set-Cookie header.
fn refresh_token_from_cookies(cookies: &[String]) -> Option<String> {
    cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .and_then(|c| c.split(';').next())
        .and_then(|kv| kv.split_once('='))
        .map(|(_, v)| v.to_string())
}

// =============================================================================
// Signup
// =============================================================================

#[tokio::test]
async fn test_signup_success() {
    let (app, db, jwt) = create_test_app().await;

    let response = signup(&app, "a@b.com", "Ann Lee", "Secret1!").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookies = extract_set_cookies(&response);
    let refresh_token = refresh_token_from_cookies(&cookies).expect("refresh cookie should be set");

    let cookie = cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains(&format!("Max-Age={}", DEFAULT_REFRESH_TTL_SECS)));

    let json = response_json(response).await;
    assert_eq!(json["user"]["email"], "a@b.com");
    assert_eq!(json["user"]["name"], "Ann Lee");

    // The access token decodes to the created account's claims.
    let claims = jwt
        .verify_access_token(json["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.email, "a@b.com");
    assert_eq!(claims.name, "Ann Lee");
    assert_eq!(claims.sub, json["user"]["id"].as_str().unwrap());

    // The stored refresh digest verifies against the cookie's token.
    let account = db.users().get_by_email("a@b.com").await.unwrap().unwrap();
    let stored = account.refresh_token_hash.expect("digest should be stored");
    assert!(password::verify_token(&refresh_token, &stored));
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let (app, db, _) = create_test_app().await;

    let response = signup(&app, "a@b.com", "Ann Lee", "Secret1!").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let before = db.users().get_by_email("a@b.com").await.unwrap().unwrap();

    let response = signup(&app, "a@b.com", "Bob", "Other2@x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(json["error"], "Email already registered");

    // The failed attempt did not mutate the existing account.
    let after = db.users().get_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.refresh_token_hash, before.refresh_token_hash);
}

#[tokio::test]
async fn test_signup_normalizes_email() {
    let (app, _, _) = create_test_app().await;

    let response = signup(&app, "  A@B.Com ", "Ann Lee", "Secret1!").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = response_json(response).await;
    assert_eq!(json["user"]["email"], "a@b.com");

    // Same email in different case is still a duplicate.
    let response = signup(&app, "a@b.COM", "Ann Lee", "Secret1!").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_validation() {
    let (app, _, _) = create_test_app().await;

    let cases = [
        ("not-an-email", "Ann Lee", "Secret1!"),
        ("a@b.com", "Al", "Secret1!"),
        ("a@b.com", "Ann Lee", "short1!"),
        ("a@b.com", "Ann Lee", "NoDigits!"),
        ("a@b.com", "Ann Lee", "NoSpecial1"),
        ("a@b.com", "Ann Lee", "1234!5678"),
    ];

    for (email, name, pass) in cases {
        let response = signup(&app, email, name, pass).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for ({}, {}, {})",
            email,
            name,
            pass
        );
        // No cookie on validation failure.
        assert!(extract_set_cookies(&response).is_empty());
    }
}

// =============================================================================
// Signin
// =============================================================================

#[tokio::test]
async fn test_signin_success() {
    let (app, _, jwt) = create_test_app().await;
    signup(&app, "a@b.com", "Ann Lee", "Secret1!").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signin",
            serde_json::json!({ "email": "a@b.com", "password": "Secret1!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    assert!(refresh_token_from_cookies(&cookies).is_some());

    let json = response_json(response).await;
    let claims = jwt
        .verify_access_token(json["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.email, "a@b.com");
}

#[tokio::test]
async fn test_signin_failures_are_indistinguishable() {
    let (app, db, _) = create_test_app().await;
    signup(&app, "a@b.com", "Ann Lee", "Secret1!").await;

    let before = db.users().get_by_email("a@b.com").await.unwrap().unwrap();

    let wrong_password = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signin",
            serde_json::json!({ "email": "a@b.com", "password": "Wrong1!x" }),
        ))
        .await
        .unwrap();
    let unknown_email = app
        .clone()
        .oneshot(json_request(
            "/api/auth/signin",
            serde_json::json!({ "email": "nobody@b.com", "password": "Secret1!" }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    // No cookie mutation on either failure.
    assert!(extract_set_cookies(&wrong_password).is_empty());
    assert!(extract_set_cookies(&unknown_email).is_empty());

    // Identical message whether the email exists or not.
    let a = response_json(wrong_password).await;
    let b = response_json(unknown_email).await;
    assert_eq!(a, b);
    assert_eq!(a["error"], "Invalid credentials");

    // The stored session was not touched by the failed signin.
    let after = db.users().get_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(after.refresh_token_hash, before.refresh_token_hash);
}

// =============================================================================
// Principal endpoints
// =============================================================================

#[tokio::test]
async fn test_me_returns_principal() {
    let (app, _, _) = create_test_app().await;

    let response = signup(&app, "a@b.com", "Ann Lee", "Secret1!").await;
    let json = response_json(response).await;
    let access_token = json["accessToken"].as_str().unwrap().to_string();

    for uri in ["/api/auth/me", "/api/users/me"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header("authorization", format!("Bearer {}", access_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["user"]["email"], "a@b.com");
        assert_eq!(json["user"]["name"], "Ann Lee");
        assert!(json["user"]["id"].is_string());
    }
}

#[tokio::test]
async fn test_me_rejects_missing_or_invalid_token() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .header("authorization", "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_refresh_token_as_bearer() {
    let (app, _, jwt) = create_test_app().await;

    let response = signup(&app, "a@b.com", "Ann Lee", "Secret1!").await;
    let cookies = extract_set_cookies(&response);
    let refresh_token = refresh_token_from_cookies(&cookies).unwrap();

    // Sanity: it is a valid refresh token, just the wrong class.
    assert!(jwt.verify_refresh_token(&refresh_token).is_ok());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .header("authorization", format!("Bearer {}", refresh_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================
// tests/integration/http_routes_tests.rs
// ============================
//! HTTP surface: routing, extractors, status codes and bodies
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use guardian_common::{CLIENT_ID_HEADER, CLIENT_KEY_HEADER};
use guardian_tests::test_utils::{setup_test_env, CLIENT_IP, TENANT_ID, TENANT_SECRET};
use serde_json::{json, Value};
use tower::ServiceExt;

fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", CLIENT_IP)
}

fn tenant_post(uri: &str, body: Value) -> Request<Body> {
    post(uri)
        .header(CLIENT_ID_HEADER, TENANT_ID)
        .header(CLIENT_KEY_HEADER, TENANT_SECRET)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login_token(app: &Router, email: &str, password: &str) -> String {
    let response = send(
        app,
        tenant_post("/api/auth/login", json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_up() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "UP");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn register_returns_created_client() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let request = post("/api/clients/register")
        .body(Body::from(
            json!({ "name": "Globex", "idleTimeoutMinutes": 45 }).to_string(),
        ))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["clientId"].as_str().unwrap().len(), 6);
    assert!(!body["clientKey"].as_str().unwrap().is_empty());
    assert_eq!(body["name"], "Globex");
    assert_eq!(body["idleTimeoutMinutes"], 45);
}

#[tokio::test]
async fn missing_tenant_headers_are_a_bad_request() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let request = post("/api/auth/signup")
        .body(Body::from(
            json!({ "email": "a@x.com", "password": "Str0ngPassw0rd" }).to_string(),
        ))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VAL_001");
}

#[tokio::test]
async fn wrong_tenant_key_is_unauthorized() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let request = post("/api/auth/login")
        .header(CLIENT_ID_HEADER, TENANT_ID)
        .header(CLIENT_KEY_HEADER, "not-the-key")
        .body(Body::from(json!({ "email": "a@x.com", "password": "pw" }).to_string()))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "AUTH_001");
}

#[tokio::test]
async fn malformed_client_id_is_unauthorized() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let request = post("/api/auth/login")
        .header(CLIENT_ID_HEADER, "not/an-id")
        .header(CLIENT_KEY_HEADER, TENANT_SECRET)
        .body(Body::from(json!({ "email": "a@x.com", "password": "pw" }).to_string()))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "AUTH_001");
}

#[tokio::test]
async fn signup_login_validate_and_logout() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let response = send(
        &app,
        tenant_post(
            "/api/auth/signup",
            json!({ "email": "a@x.com", "password": "Str0ngPassw0rd", "firstName": "Ada" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);

    let duplicate = send(
        &app,
        tenant_post(
            "/api/auth/signup",
            json!({ "email": "a@x.com", "password": "Str0ngPassw0rd" }),
        ),
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let token = login_token(&app, "a@x.com", "Str0ngPassw0rd").await;
    let response = send(&app, tenant_post("/api/auth/validate", json!({ "token": token }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["clientId"], TENANT_ID);
    assert!(body["sessionId"].is_string());

    let logout = post("/api/auth/logout")
        .header(CLIENT_ID_HEADER, TENANT_ID)
        .header(CLIENT_KEY_HEADER, TENANT_SECRET)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, logout).await.status(), StatusCode::OK);

    let response = send(&app, tenant_post("/api/auth/validate", json!({ "token": token }))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "SESSION_001");
}

#[tokio::test]
async fn logout_all_reports_ended_sessions() {
    let env = setup_test_env().await;
    env.seed_user("a@x.com", "pw").await;
    let app = env.guardian.router();

    let first = login_token(&app, "a@x.com", "pw").await;
    let _second = login_token(&app, "a@x.com", "pw").await;

    let request = post("/api/auth/logout-all")
        .header(CLIENT_ID_HEADER, TENANT_ID)
        .header(CLIENT_KEY_HEADER, TENANT_SECRET)
        .header(header::AUTHORIZATION, format!("Bearer {first}"))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["sessionsEnded"], 2);
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let request = post("/api/auth/logout")
        .header(CLIENT_ID_HEADER, TENANT_ID)
        .header(CLIENT_KEY_HEADER, TENANT_SECRET)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "TOKEN_001");
}

#[tokio::test]
async fn blocked_source_gets_retry_after() {
    let env = setup_test_env().await;
    env.seed_user("a@x.com", "pw").await;
    let app = env.guardian.router();

    for _ in 0..5 {
        let response = send(
            &app,
            tenant_post("/api/auth/login", json!({ "email": "a@x.com", "password": "bad" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = send(
        &app,
        tenant_post("/api/auth/login", json!({ "email": "a@x.com", "password": "pw" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "900");
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "RATE_002");
    assert_eq!(body["error"]["retryAfter"], 900);
}

#[tokio::test]
async fn rotate_key_swaps_the_tenant_secret() {
    let env = setup_test_env().await;
    let app = env.guardian.router();

    let response = send(&app, tenant_post("/api/clients/rotate-key", json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["clientId"], TENANT_ID);
    let new_key = body["newClientKey"].as_str().unwrap().to_string();
    assert_ne!(new_key, TENANT_SECRET);

    // The old key no longer authenticates.
    let response = send(&app, tenant_post("/api/clients/rotate-key", json!({}))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

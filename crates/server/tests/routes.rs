use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use db::DBService;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use server::{AppState, ServerConfig, auth::AdminTokenService, routes};
use services::services::{
    aha::AhaClient, summarizer::SummaryService, sync::SyncService,
};
use tower::ServiceExt;

const TEST_SECRET: &str = "test-jwt-secret";
const TEST_PASSWORD: &str = "correct horse";

async fn test_app() -> (Router, AdminTokenService) {
    let pool = db::test_utils::create_test_pool().await;
    let db = DBService::from_pool(pool);
    let aha = AhaClient::new(None);
    let summarizer = SummaryService::new(Default::default());
    let sync = SyncService::new(db.clone(), aha.clone(), summarizer.clone());
    let admin_token = AdminTokenService::new(SecretString::from(TEST_SECRET));
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        admin_password: Some(SecretString::from(TEST_PASSWORD)),
        token_secret: SecretString::from(TEST_SECRET),
    };
    let state = AppState::new(db, aha, summarizer, sync, admin_token.clone(), config);
    (routes::router(state), admin_token)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(mut req: Request<Body>, token: &str) -> Request<Body> {
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    req
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _) = test_app().await;
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_issues_a_day_long_token() {
    let (app, tokens) = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["expiresIn"], 24 * 60 * 60);
    let claims = tokens.verify(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.role, "admin");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "password": "nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_missing_and_bad_tokens() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/initiatives/admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "No token provided");

    let response = app
        .oneshot(with_bearer(get("/api/initiatives/admin"), "not-a-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "invalid token");
}

#[tokio::test]
async fn admin_routes_accept_issued_tokens() {
    let (app, tokens) = test_app().await;
    let (token, _) = tokens.generate().unwrap();

    let response = app
        .oneshot(with_bearer(get("/api/initiatives/admin"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn public_board_is_open_and_initially_empty() {
    let (app, _) = test_app().await;
    let response = app.oneshot(get("/api/initiatives")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn updating_an_unknown_initiative_is_not_found() {
    let (app, tokens) = test_app().await;
    let (token, _) = tokens.generate().unwrap();

    let response = app
        .oneshot(with_bearer(
            json_request(
                "PUT",
                "/api/initiatives/00000000-0000-0000-0000-000000000000",
                json!({ "title": "renamed" }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn config_round_trips_through_the_api() {
    let (app, tokens) = test_app().await;
    let (token, _) = tokens.generate().unwrap();

    let response = app
        .clone()
        .oneshot(with_bearer(
            json_request(
                "PUT",
                "/api/config",
                json!({
                    "ai_provider": "gemini-pro",
                    "selected_releases": ["2025 Q3"],
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(with_bearer(get("/api/config"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ai_provider"], "gemini-pro");
    assert_eq!(body["selected_releases"], "[\"2025 Q3\"]");
}

#[tokio::test]
async fn no_ai_models_offered_without_credentials() {
    let (app, tokens) = test_app().await;
    let (token, _) = tokens.generate().unwrap();

    let response = app
        .oneshot(with_bearer(get("/api/config/ai-models"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "models": [] }));
}

#[tokio::test]
async fn cancelling_an_idle_sync_is_a_bad_request() {
    let (app, tokens) = test_app().await;
    let (token, _) = tokens.generate().unwrap();

    let response = app
        .oneshot(with_bearer(
            json_request("POST", "/api/sync/cancel", json!({})),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "No sync in progress");
}

#[tokio::test]
async fn token_verify_reports_validity() {
    let (app, tokens) = test_app().await;
    let (token, _) = tokens.generate().unwrap();

    let response = app
        .clone()
        .oneshot(with_bearer(get("/api/auth/verify"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["role"], "admin");

    let response = app.oneshot(get("/api/auth/verify")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

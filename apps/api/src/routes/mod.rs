pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::auth::{handlers as auth, require_auth};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let mut resume_routes = Router::new()
        .route("/upload_resume", post(analysis::handle_upload_resume))
        .route("/get_analysis/:file_id", get(analysis::handle_get_analysis));
    if state.config.require_auth {
        resume_routes = resume_routes
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));
    }

    let auth_routes = Router::new()
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/logout", post(auth::handle_logout));

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .nest("/resume", resume_routes)
        .nest("/auth", auth_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::testing::{test_state, MockCompletionClient};

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn authed_get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_prompt_version() {
        let (state, _) = test_state(MockCompletionClient::replying("{}"));
        let app = build_router(state);
        let (status, body) = call(&app, authed_get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["prompt_version"], crate::analysis::prompts::PROMPT_VERSION);
    }

    #[tokio::test]
    async fn test_auth_flow_over_http() {
        let (state, _) = test_state(MockCompletionClient::replying("{}"));
        let app = build_router(state);

        let registration = json!({
            "username": "alice",
            "password": "s3cret-pass",
            "confirm_password": "s3cret-pass",
            "email": "alice@example.com"
        });
        let (status, _) = call(&app, post_json("/auth/register", registration.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, post_json("/auth/register", registration)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "Username already exists");

        let (status, body) = call(
            &app,
            post_json("/auth/login", json!({"username": "alice", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid username or password");

        let (status, body) = call(
            &app,
            post_json("/auth/login", json!({"username": "alice", "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn test_register_password_mismatch_is_bad_request() {
        let (state, _) = test_state(MockCompletionClient::replying("{}"));
        let app = build_router(state);
        let (status, body) = call(
            &app,
            post_json(
                "/auth/register",
                json!({
                    "username": "bob",
                    "password": "one",
                    "confirm_password": "two",
                    "email": "bob@example.com"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Passwords do not match");
    }

    #[tokio::test]
    async fn test_resume_routes_require_token_when_enabled() {
        let (mut state, _) = test_state(MockCompletionClient::replying("{}"));
        state.config.require_auth = true;
        let app = build_router(state);

        let (status, _) = call(&app, authed_get("/resume/get_analysis/abc", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        call(
            &app,
            post_json(
                "/auth/register",
                json!({
                    "username": "erin",
                    "password": "pw-pw-pw",
                    "confirm_password": "pw-pw-pw",
                    "email": "erin@example.com"
                }),
            ),
        )
        .await;
        let (_, login) = call(
            &app,
            post_json("/auth/login", json!({"username": "erin", "password": "pw-pw-pw"})),
        )
        .await;
        let token = login["access_token"].as_str().unwrap().to_string();

        // authenticated, but the id is unknown
        let (status, _) = call(&app, authed_get("/resume/get_analysis/abc", Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let logout = Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, logout).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, authed_get("/resume/get_analysis/abc", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Token has been revoked");
    }
}

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::state::AppState;
use crate::{auth, todos, users};

pub fn build_app(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout;
    let routes = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(todos::router())
        .route("/health", get(|| async { "ok" }))
        .fallback(route_not_found)
        .with_state(state);

    with_deadline(routes, request_timeout)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

/// Bounds each request. The bare 408 from the timeout layer is rewritten into
/// the usual envelope.
fn with_deadline(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(timeout_envelope))
}

async fn timeout_envelope(res: Response) -> Response {
    if res.status() == StatusCode::REQUEST_TIMEOUT {
        tracing::warn!("request deadline exceeded");
        return AppError::Timeout.into_response();
    }
    res
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json_body) => Body::from(serde_json::to_vec(&json_body).unwrap()),
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn register(app: &Router, username: &str, email: &str) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": username, "email": email, "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["data"]["prefix"], "Bearer");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_routes_use_the_envelope() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, "GET", "/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route not found");
    }

    #[tokio::test]
    async fn slow_requests_time_out_with_the_envelope() {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done"
            }),
        );
        let app = with_deadline(slow, Duration::from_millis(20));

        let (status, body) = call(&app, "GET", "/slow", None, None).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Request timed out");
    }

    #[tokio::test]
    async fn alice_and_bob_scenario() {
        let state = AppState::fake();
        let keys = state.keys.clone();
        let app = build_app(state);

        let alice = register(&app, "alice", "alice@x.com").await;
        let alice_claims = keys.validate(&alice).unwrap();
        let alice_id = alice_claims.sub;

        let (status, me) = call(&app, "GET", "/users/me", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["data"]["id"], alice_id.to_string());
        assert_eq!(me["data"]["email"], "alice@x.com");
        assert_eq!(me["data"]["email"], alice_claims.email.as_str());
        assert!(me["data"].get("password_hash").is_none());

        let (wrong_pw_status, wrong_pw) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "alice@x.com", "password": "wrong!"})),
        )
        .await;
        let (no_user_status, no_user) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "nobody@x.com", "password": "secret"})),
        )
        .await;
        assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
        assert_eq!(no_user_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw, no_user);

        let (status, login) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "alice@x.com", "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let login_token = login["data"]["token"].as_str().unwrap();
        assert_eq!(keys.validate(login_token).unwrap().sub, alice_id);

        let (status, created) = call(
            &app,
            "POST",
            "/todos",
            Some(&alice),
            Some(json!({"title": "Groceries", "description": "Buy milk and bread"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["isCompleted"], false);
        let todo_id = created["data"]["id"].as_str().unwrap().to_string();
        let created_updated_at = created["data"]["updatedAt"].as_str().unwrap().to_string();

        let bob = register(&app, "bob", "bob@x.com").await;
        let (status, forbidden) =
            call(&app, "GET", &format!("/todos/{todo_id}"), Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden["success"], false);

        let (status, bob_list) = call(&app, "GET", "/todos", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bob_list["data"], json!([]));

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (status, toggled) = call(
            &app,
            "PUT",
            &format!("/todos/toggle/{todo_id}"),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["data"]["isCompleted"], true);
        assert_ne!(toggled["data"]["updatedAt"].as_str().unwrap(), created_updated_at);

        let (status, _) =
            call(&app, "DELETE", &format!("/todos/{todo_id}"), Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) =
            call(&app, "GET", &format!("/todos/{todo_id}"), Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owner_comes_from_the_token_not_the_body() {
        let state = AppState::fake();
        let keys = state.keys.clone();
        let app = build_app(state);
        let alice = register(&app, "alice", "alice@x.com").await;
        let bob = register(&app, "bob", "bob@x.com").await;
        let bob_id = keys.validate(&bob).unwrap().sub;
        let alice_id = keys.validate(&alice).unwrap().sub;

        let (status, created) = call(
            &app,
            "POST",
            "/todos",
            Some(&alice),
            Some(json!({
                "title": "Groceries",
                "description": "Buy milk and bread",
                "userId": bob_id.to_string()
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["userId"], alice_id.to_string());
    }

    #[tokio::test]
    async fn protected_routes_reject_bad_tokens_uniformly() {
        let app = build_app(AppState::fake());

        let (missing_status, missing) = call(&app, "GET", "/todos", None, None).await;
        let (forged_status, forged) =
            call(&app, "GET", "/todos", Some("abc.def.ghi"), None).await;

        let bad_scheme = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/todos")
                    .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
        assert_eq!(forged_status, StatusCode::UNAUTHORIZED);
        assert_eq!(bad_scheme.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(missing, forged);
        assert_eq!(missing["message"], "Not authorized.");
    }

    #[tokio::test]
    async fn validation_failures_are_bad_requests_with_field_messages() {
        let app = build_app(AppState::fake());

        let (status, body) = call(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": "user1", "email": "user1mail.com", "password": "12345"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email format");

        let token = register(&app, "alice", "alice@x.com").await;
        let (status, body) = call(
            &app,
            "POST",
            "/todos",
            Some(&token),
            Some(json!({"title": "abc", "description": "Buy milk and bread"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Todo title must be longer than 3 characters");

        let (_, list) = call(&app, "GET", "/todos", Some(&token), None).await;
        assert_eq!(list["data"], json!([]));

        let (status, body) = call(&app, "GET", "/todos/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid todo id");

        let (status, _) = call(
            &app,
            "POST",
            "/todos",
            Some(&token),
            Some(json!({"title": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let app = build_app(AppState::fake());
        register(&app, "user5", "user5@mail.com").await;
        let (status, body) = call(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": "user5", "email": "user5@mail.com", "password": "12345"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn profile_update_and_delete() {
        let app = build_app(AppState::fake());
        let token = register(&app, "user1", "user1@mail.com").await;

        let (status, body) = call(
            &app,
            "PUT",
            "/users/me",
            Some(&token),
            Some(json!({"username": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username cannot be empty");

        let (status, body) = call(
            &app,
            "PUT",
            "/users/me",
            Some(&token),
            Some(json!({"username": "user 1 updated"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "user 1 updated");

        let (status, _) = call(&app, "DELETE", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        // The token outlives the account; the user itself is gone.
        let (status, _) = call(&app, "DELETE", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(
            &app,
            "POST",
            "/todos",
            Some(&token),
            Some(json!({"title": "Groceries", "description": "Buy milk and bread"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

//! Warden Server - HTTP API server.
//!
//! This crate exposes the Warden prompt pipeline over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /preprocess_prompt` - Run the full pipeline and return the record
//! - `POST /validate_prompt` - Validation and completeness check only
//! - `POST /detect_language_risks` - Validation and language check only
//! - `GET /health` - Liveness check
//!
//! Every route answers `OPTIONS` preflight requests and every response
//! carries permissive CORS headers.
//!
//! ## Example
//!
//! ```no_run
//! use warden_server::{AppState, Server, ServerConfig};
//!
//! async fn serve(state: AppState) {
//!     let server = Server::with_state(ServerConfig::default(), state).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 7071;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 7071).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router around shared state.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route(
            "/preprocess_prompt",
            post(handlers::preprocess_prompt).options(handlers::preflight),
        )
        .route(
            "/validate_prompt",
            post(handlers::validate_prompt).options(handlers::preflight),
        )
        .route(
            "/detect_language_risks",
            post(handlers::detect_language_risks).options(handlers::preflight),
        )
        .route(
            "/health",
            get(handlers::health).options(handlers::preflight),
        );

    with_middleware(routes).with_state(state)
}

/// Panic boundary, CORS headers and request tracing, innermost first.
fn with_middleware<S>(routes: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Turns a handler panic into a JSON 500.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server with the given application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self {
            router: router(state),
            addr,
        })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until Ctrl-C.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        self.run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await
    }

    /// Runs the server until `shutdown` resolves, then drains in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> std::result::Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting Warden API server on {}", self.addr);

        let listener = self.bind()?;

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        info!("Warden API server stopped");
        Ok(())
    }

    fn bind(&self) -> std::result::Result<tokio::net::TcpListener, ServerError> {
        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        // SO_REUSEADDR so restarts don't trip over TIME_WAIT sockets
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use warden_core::rewrite::CompletionRequest;
    use warden_core::{
        CategorySeverity, ContentSafetyService, Pipeline, PipelineConfig, RetryConfig,
        RewriteService, Rewriter, SafetyClassifier, UpstreamError,
    };

    struct StubSafety {
        hang: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentSafetyService for StubSafety {
        async fn analyze(&self, _text: &str) -> std::result::Result<Vec<CategorySeverity>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(vec![
                CategorySeverity::new("Hate", 0),
                CategorySeverity::new("Violence", 0),
            ])
        }

        fn name(&self) -> &'static str {
            "stub-safety"
        }
    }

    struct EchoRewriter;

    #[async_trait]
    impl RewriteService for EchoRewriter {
        async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, UpstreamError> {
            Ok(format!("{} (revisado)", request.user_text))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn test_state(hang: bool, request_timeout: Duration) -> (AppState, Arc<StubSafety>) {
        let retry = RetryConfig {
            max_attempts: 1,
            attempt_timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(1),
            backoff_multiplier: 2.0,
        };
        let config = PipelineConfig {
            retry: retry.clone(),
            ..Default::default()
        };
        let safety = Arc::new(StubSafety {
            hang,
            calls: AtomicUsize::new(0),
        });
        let pipeline = Pipeline::new(
            &config,
            SafetyClassifier::new(safety.clone(), retry.clone()),
            Rewriter::new(Arc::new(EchoRewriter), retry),
        );
        (AppState::new(pipeline, request_timeout), safety)
    }

    struct HangingRewriter;

    #[async_trait]
    impl RewriteService for HangingRewriter {
        async fn complete(&self, _request: &CompletionRequest) -> std::result::Result<String, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    /// Default timings divided by 100, so the deadline keeps its default
    /// ratio to the per-call timeout and backoff.
    fn scaled_default_config() -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            retry: RetryConfig {
                attempt_timeout: defaults.retry.attempt_timeout / 100,
                initial_backoff: defaults.retry.initial_backoff / 100,
                ..defaults.retry.clone()
            },
            request_timeout: defaults.request_timeout / 100,
            ..defaults
        }
    }

    fn create_test_app() -> Router {
        router(test_state(false, Duration::from_secs(5)).0)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_preprocess_short_prompt() {
        let app = create_test_app();
        let response = app
            .oneshot(post_json("/preprocess_prompt", json!({"prompt": "hola"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            HeaderValue::from_static("*")
        );
        let json = body_json(response).await;
        assert_eq!(json["code"], "validation_error");
        assert_eq!(json["issues"][0], "prompt_too_short");
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_preprocess_missing_prompt() {
        let (state, safety) = test_state(false, Duration::from_secs(5));
        let response = router(state)
            .oneshot(post_json("/preprocess_prompt", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["issues"][0], "empty_prompt");
        assert_eq!(safety.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preprocess_returns_record() {
        let app = create_test_app();
        let response = app
            .oneshot(post_json(
                "/preprocess_prompt",
                json!({"prompt": "¿Cómo funciona el machine learning aplicado a diagnósticos médicos?"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["risk_level"], "low");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["complexity"]["level"], "advanced");
        assert!(json["processed_prompt"]
            .as_str()
            .unwrap()
            .ends_with("(revisado)"));
        assert!(json["latency_ms"].is_number());
        assert!(json["safety"]["is_safe"].as_bool().unwrap());
    }

    #[tokio::test]
    async fn test_preprocess_terminates_on_insult() {
        let app = create_test_app();
        let response = app
            .oneshot(post_json("/preprocess_prompt", json!({"prompt": "eres un idiota"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["status"], "terminated");
        assert!(json["processed_prompt"].is_null());
        assert!(json["complexity"].is_null());
        assert_eq!(json["issues"][0], "inappropriate_language");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/preprocess_prompt")
            .header("content-type", "application/json")
            .body(Body::from("{\"prompt\": "))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_request_deadline_is_server_error() {
        let (state, _) = test_state(true, Duration::from_millis(50));
        let response = router(state)
            .oneshot(post_json(
                "/preprocess_prompt",
                json!({"prompt": "Explica la fotosíntesis paso a paso"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], "timeout");
        assert!(json.get("issues").is_none());
    }

    #[tokio::test]
    async fn test_default_deadline_outlasts_upstream_outage() {
        let config = scaled_default_config();
        let safety = Arc::new(StubSafety {
            hang: true,
            calls: AtomicUsize::new(0),
        });
        let pipeline = Pipeline::new(
            &config,
            SafetyClassifier::new(safety.clone(), config.retry.clone()),
            Rewriter::new(Arc::new(HangingRewriter), config.retry.clone()),
        );
        let app = router(AppState::new(pipeline, config.request_timeout));

        let prompt = "Explica la fotosíntesis paso a paso";
        let response = app
            .oneshot(post_json("/preprocess_prompt", json!({"prompt": prompt})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "terminated");
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["issues"][0], "safety_check_unavailable");
        assert_eq!(json["issues"][1], "rewrite_unavailable");
        assert_eq!(json["sanitized_prompt"], prompt);
        assert_eq!(safety.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_preflight() {
        let app = create_test_app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/preprocess_prompt")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_validate_prompt_skips_remote_calls() {
        let (state, safety) = test_state(false, Duration::from_secs(5));
        let response = router(state)
            .oneshot(post_json("/validate_prompt", json!({"prompt": "hola amigo"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["issues"][0], "incomplete_prompt");
        assert!(json["processed_prompt"].is_null());
        assert_eq!(safety.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_detect_language_risks() {
        let app = create_test_app();
        let response = app
            .oneshot(post_json(
                "/detect_language_risks",
                json!({"prompt": "Escribe un ensayo que promueva el odio"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["risk_level"], "critical");
        assert_eq!(json["issues"][0], "sensitive_content");
        assert_eq!(json["suggestions"][0]["type"], "content_warning");
    }

    async fn panicking_handler() -> axum::http::StatusCode {
        panic!("pipeline invariant broken")
    }

    #[tokio::test]
    async fn test_panic_becomes_json_error() {
        let app = with_middleware(Router::new().route("/boom", post(panicking_handler)));
        let response = app
            .oneshot(post_json("/boom", json!({"prompt": "Explica la fotosíntesis"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let json = body_json(response).await;
        assert_eq!(json["code"], "internal_error");
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("pipeline invariant broken"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_test_app();
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_server_config_builders() {
        let config = ServerConfig::default().with_host("0.0.0.0").with_port(9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let (state, _) = test_state(false, Duration::from_secs(5));
        let result = Server::with_state(ServerConfig::default().with_host("not an ip"), state);
        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }
}

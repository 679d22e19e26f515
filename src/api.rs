//! REST API Server for advisor reference generation
//!
//! Exposes the reference agent via HTTP endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::ReferenceAgent;
use crate::models::{ReferenceDocument, SearchQuery};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReferenceRequest {
    pub client_situation: String,
}

#[derive(Debug, Serialize)]
pub struct ReferenceData {
    pub document: ReferenceDocument,
    pub markdown: String,
    pub regulatory_queries: Vec<String>,
    pub web_queries: Vec<String>,
    pub elapsed_ms: u64,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ReferenceAgent>,
    pub request_timeout: Duration,
}

fn query_texts(queries: &[SearchQuery]) -> Vec<String> {
    queries.iter().map(|q| q.text.clone()).collect()
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Reference Endpoint
/// =============================

async fn generate_reference(
    State(state): State<ApiState>,
    Json(req): Json<ReferenceRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(
        chars = req.client_situation.chars().count(),
        "Received reference request"
    );

    // Dropping the pipeline future on timeout abandons in-flight provider calls
    let run = tokio::time::timeout(
        state.request_timeout,
        state.agent.generate_report(&req.client_situation),
    )
    .await;

    match run {
        Ok(Ok(report)) => {
            let data = ReferenceData {
                markdown: report.document.to_markdown(),
                regulatory_queries: query_texts(&report.queries.regulatory),
                web_queries: query_texts(&report.queries.web),
                elapsed_ms: report.elapsed_ms,
                document: report.document,
            };
            (StatusCode::OK, Json(ApiResponse::success(data)))
        }
        Ok(Err(e)) if e.is_validation() => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())))
        }
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Reference generation failed: {}", e))),
        ),
        Err(_) => {
            warn!(
                timeout_secs = state.request_timeout.as_secs_f32(),
                "Reference request timed out"
            );
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(ApiResponse::error(format!(
                    "Reference generation timed out after {}s",
                    state.request_timeout.as_secs_f32()
                ))),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<ReferenceAgent>, request_timeout: Duration) -> Router {
    let state = ApiState {
        agent,
        request_timeout,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/reference", post(generate_reference))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<ReferenceAgent>,
    request_timeout: Duration,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent, request_timeout);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResearchLimits, Settings};
    use crate::testing::{passage, ScriptedGenerator, StubSearch, StubWebSearch};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const SYNTHESIS_REPLY: &str = r#"```json
{"regulatory_overview": [{"regulation": "TFSA contribution room", "source": "RC4466", "details": "Unused room carries forward"}]}
```"#;

    fn router_with(search: StubSearch, settings: &Settings, timeout: Duration) -> Router {
        let generator = Arc::new(ScriptedGenerator::new(|prompt: &str| {
            if prompt.starts_with("CLIENT SITUATION:") {
                Ok(SYNTHESIS_REPLY.to_string())
            } else if prompt.contains("CRA regulatory documents") {
                Ok("TFSA contribution rules".to_string())
            } else {
                Ok("TFSA limit 2025 Canada".to_string())
            }
        }));
        let agent = ReferenceAgent::with_providers(
            generator,
            Arc::new(search),
            Arc::new(StubWebSearch::new()),
            settings,
        );
        create_router(Arc::new(agent), timeout)
    }

    fn router() -> Router {
        let search = StubSearch::new().with_default(vec![passage("TFSA Guide", "Room accumulates", 0.8)]);
        router_with(search, &Settings::default(), Duration::from_secs(5))
    }

    fn post_reference(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/reference")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_reference_success() {
        let response = router()
            .oneshot(post_reference(serde_json::json!({
                "client_situation": "Client has unused TFSA room from 2019."
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);

        let data = &body["data"];
        assert_eq!(data["regulatory_queries"], serde_json::json!(["TFSA contribution rules"]));
        assert_eq!(data["web_queries"], serde_json::json!(["TFSA limit 2025 Canada"]));
        assert_eq!(
            data["document"]["regulatory_overview"][0]["regulation"],
            "TFSA contribution room"
        );
        assert!(data["markdown"]
            .as_str()
            .unwrap()
            .contains("**TFSA contribution room** (RC4466)"));
    }

    #[tokio::test]
    async fn test_blank_situation_is_bad_request() {
        let response = router()
            .oneshot(post_reference(serde_json::json!({ "client_situation": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Validation error"));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let search = StubSearch::new().with_delay("TFSA contribution rules", Duration::from_secs(30));
        let settings = Settings {
            limits: ResearchLimits {
                query_timeout: None,
                ..ResearchLimits::default()
            },
            ..Settings::default()
        };

        let response = router_with(search, &settings, Duration::from_millis(50))
            .oneshot(post_reference(serde_json::json!({
                "client_situation": "TFSA over-contribution question"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}

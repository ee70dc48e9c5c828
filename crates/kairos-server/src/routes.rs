use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use kairos_core::{GenerationRequest, RelayRequest, RelayResponse};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::upstream::Upstream;

pub const EMPTY_REQUEST: &str = "Mensaje o imagen vacíos";
pub const NO_RESPONSE: &str = "No se pudo obtener respuesta de la API";

#[derive(Clone)]
pub struct AppState {
    upstream: Arc<dyn Upstream>,
    system_prompt: Arc<str>,
}

impl AppState {
    pub fn new(upstream: Arc<dyn Upstream>, system_prompt: &str) -> Self {
        Self {
            upstream,
            system_prompt: Arc::from(system_prompt),
        }
    }
}

pub fn router(state: AppState, allowed_origin: Option<&str>) -> Router {
    Router::new()
        .route("/chat-api", post(chat))
        .route("/health", get(health))
        .layer(cors_layer(allowed_origin))
        .with_state(state)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "invalid allowed origin, allowing any");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Json<RelayResponse> {
    // An unreadable body is treated like an empty one
    let request: RelayRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "chat request body is not JSON");
        RelayRequest::default()
    });

    Json(relay(state.upstream.as_ref(), &state.system_prompt, request).await)
}

/// Answer one chat request. Every outcome is a response envelope.
pub async fn relay(upstream: &dyn Upstream, system_prompt: &str, request: RelayRequest) -> RelayResponse {
    if request.is_empty() {
        return RelayResponse::failure(EMPTY_REQUEST);
    }

    tracing::info!(
        chars = request.message.chars().count(),
        has_image = request.image.is_some(),
        "chat request"
    );

    let generation = GenerationRequest {
        system_prompt: system_prompt.to_string(),
        message: request.message,
        image: request.image,
    };

    match upstream.generate(&generation).await {
        Ok(Some(text)) if !text.is_empty() => RelayResponse::ok(text),
        Ok(_) => {
            tracing::warn!("upstream returned no text");
            RelayResponse::failure(NO_RESPONSE)
        }
        Err(e) => {
            tracing::error!(error = %e, "upstream request failed");
            RelayResponse::failure(e.to_string())
        }
    }
}

//! HTTP handlers for the pico server

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{
    ConceptsRequest, ConceptsResponse, ErrorBody, PicoRequest, PicoResponse, QueryRequest,
    QueryResponse, SearchTermsResponse, TitleRequest,
};
use pico::{build_boolean_query, LlmConfig, OpenAiClient, PicoError};

/// Shared server state
pub struct AppState {
    pub client: Arc<OpenAiClient>,
}

impl AppState {
    /// Build the one client every request shares.
    ///
    /// The client owns a tokio runtime, which must not be created inside an
    /// async context, so construction happens on the blocking pool.
    pub async fn connect(config: LlmConfig) -> pico::Result<Self> {
        let client = tokio::task::spawn_blocking(move || OpenAiClient::new(config))
            .await
            .map_err(|e| PicoError::Config(format!("client setup task failed: {}", e)))??;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

fn error_response(status: StatusCode, message: impl Into<String>, kind: &str) -> Response {
    (status, Json(ErrorBody::new(message, kind))).into_response()
}

/// Map a library error onto an HTTP error
fn pico_error_response(err: &PicoError) -> Response {
    match err {
        PicoError::MissingApiKey | PicoError::Config(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), "configuration_error")
        }
        PicoError::Generation { .. } => {
            error_response(StatusCode::BAD_GATEWAY, err.to_string(), "upstream_error")
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), "server_error"),
    }
}

/// Run `f` with the shared client on the blocking pool (the client is synchronous)
async fn with_client<T, F>(state: &AppState, request_id: &str, f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&OpenAiClient) -> pico::Result<T> + Send + 'static,
{
    let client = Arc::clone(&state.client);
    let result = tokio::task::spawn_blocking(move || f(&client)).await;

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(request_id, error = %e, cause = %e.cause(), "request failed");
            Err(pico_error_response(&e))
        }
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Task join error: {}", e),
            "server_error",
        )),
    }
}

fn new_request_id() -> String {
    format!("pico-{}", Uuid::new_v4())
}

/// Handler for POST /v1/pico
pub async fn pico_from_title(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TitleRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "title must not be empty",
            "invalid_request_error",
        );
    }

    let id = new_request_id();
    let title = req.title;
    match with_client(&state, &id, move |client| {
        pico::generate_pico_from_title(client, &title)
    })
    .await
    {
        Ok(pico) => Json(PicoResponse {
            id,
            complete: pico.is_complete(),
            pico,
        })
        .into_response(),
        Err(resp) => resp,
    }
}

/// Handler for POST /v1/pico/refine
pub async fn refine_pico(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PicoRequest>,
) -> Response {
    let id = new_request_id();
    match with_client(&state, &id, move |client| pico::refine_pico(client, &req.pico)).await {
        Ok(pico) => Json(PicoResponse {
            id,
            complete: pico.is_complete(),
            pico,
        })
        .into_response(),
        Err(resp) => resp,
    }
}

/// Handler for POST /v1/concepts
pub async fn concepts_from_pico(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PicoRequest>,
) -> Response {
    let id = new_request_id();
    match with_client(&state, &id, move |client| {
        pico::generate_concepts_from_pico(client, &req.pico)
    })
    .await
    {
        Ok(concepts) => Json(ConceptsResponse { id, concepts }).into_response(),
        Err(resp) => resp,
    }
}

/// Handler for POST /v1/search-terms
pub async fn search_terms(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConceptsRequest>,
) -> Response {
    let id = new_request_id();
    match with_client(&state, &id, move |client| {
        pico::generate_search_terms_for_concepts(client, req.concepts.as_slice())
    })
    .await
    {
        Ok(terms) => Json(SearchTermsResponse { id, terms }).into_response(),
        Err(resp) => resp,
    }
}

/// Handler for POST /v1/query
pub async fn boolean_query(Json(req): Json<QueryRequest>) -> Json<QueryResponse> {
    Json(QueryResponse {
        query: build_boolean_query(&req.terms),
    })
}

/// Handler for GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.client.config().model,
    }))
}

//! Request/response bodies for the pico server

use pico::{ConceptList, ConceptTermSet, PicoRecord};
use serde::{Deserialize, Serialize};

/// Body for POST /v1/pico
#[derive(Debug, Clone, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

/// Body for POST /v1/pico/refine and POST /v1/concepts
#[derive(Debug, Clone, Deserialize)]
pub struct PicoRequest {
    pub pico: PicoRecord,
}

/// Body for POST /v1/search-terms
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptsRequest {
    pub concepts: ConceptList,
}

/// Body for POST /v1/query
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub terms: ConceptTermSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct PicoResponse {
    pub id: String,
    pub pico: PicoRecord,
    /// True when every element was filled in
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptsResponse {
    pub id: String,
    pub concepts: ConceptList,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchTermsResponse {
    pub id: String,
    pub terms: ConceptTermSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
}

/// Error payload, OpenAI style
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                kind: kind.into(),
            },
        }
    }
}

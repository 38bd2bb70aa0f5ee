//! # pico - literature search strategy assistant
//!
//! Turns a research title into a PICO, ranked search concepts, MeSH and
//! free-text terms, and finally a boolean query, using an LLM for the
//! generative steps and tolerant line parsers to read its replies.

pub mod assistant;
pub mod client;
pub mod error;
pub mod parsing;
pub mod prompts;
pub mod query;
pub mod types;

// Re-exports
pub use assistant::{
    generate_concepts_from_pico, generate_pico_from_title, generate_search_terms_for_concepts,
    refine_pico,
};
pub use client::{LlmClient, OpenAiClient};
pub use error::{PicoError, Result};
pub use prompts::Task;
pub use query::build_boolean_query;
pub use types::{
    ChatCompletion, CompletionRequest, ConceptList, ConceptTermSet, ConceptTerms, LlmConfig,
    PicoElement, PicoRecord, ResponseFormat, Usage,
};

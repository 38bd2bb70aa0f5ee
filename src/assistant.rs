//! The four generation steps of the search-strategy workflow.
//!
//! Each step renders a prompt, sends it through an [`LlmClient`] and parses
//! the reply. Any failure is logged with its cause and returned as
//! [`PicoError::Generation`] for that step.

use crate::client::LlmClient;
use crate::error::{PicoError, Result};
use crate::parsing::{parse_concepts, parse_pico, parse_search_terms_all};
use crate::prompts::{
    build_concepts_from_pico_prompt, build_pico_from_title_prompt, build_refine_pico_prompt,
    build_search_terms_prompt, Task,
};
use crate::types::{ChatCompletion, CompletionRequest, ConceptList, ConceptTermSet, PicoRecord};

/// Send a task's prompt and return the reply, rejecting blank content
fn run_task<C: LlmClient + ?Sized>(client: &C, task: Task, prompt: String) -> Result<ChatCompletion> {
    let request = CompletionRequest::new(prompt)
        .with_system(task.system_prompt())
        .with_temperature(task.temperature())
        .with_max_tokens(task.max_tokens());

    tracing::info!(task = task.name(), model = client.model(), "sending prompt");
    let completion = client.complete(&request)?;

    if completion.content.trim().is_empty() {
        return Err(PicoError::EmptyResponse);
    }
    if let Some(usage) = &completion.usage {
        tracing::debug!(
            task = task.name(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "received reply"
        );
    }
    Ok(completion)
}

fn wrap_failure<T>(task: Task, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        tracing::error!(task = task.name(), error = %e, "generation failed");
        PicoError::generation(task, e)
    })
}

/// Derive PICO elements from a research title
pub fn generate_pico_from_title<C: LlmClient + ?Sized>(client: &C, title: &str) -> Result<PicoRecord> {
    let task = Task::PicoFromTitle;
    wrap_failure(task, {
        run_task(client, task, build_pico_from_title_prompt(title)).map(|c| parse_pico(&c.content))
    })
}

/// Ask the model for a clearer, more specific version of `pico`
pub fn refine_pico<C: LlmClient + ?Sized>(client: &C, pico: &PicoRecord) -> Result<PicoRecord> {
    let task = Task::RefinePico;
    wrap_failure(task, {
        run_task(client, task, build_refine_pico_prompt(pico)).map(|c| parse_pico(&c.content))
    })
}

/// Extract ranked search concepts from a PICO
pub fn generate_concepts_from_pico<C: LlmClient + ?Sized>(
    client: &C,
    pico: &PicoRecord,
) -> Result<ConceptList> {
    let task = Task::ConceptsFromPico;
    wrap_failure(task, {
        run_task(client, task, build_concepts_from_pico_prompt(pico))
            .map(|c| parse_concepts(&c.content))
    })
}

/// Generate MeSH and text terms for every concept in one request
pub fn generate_search_terms_for_concepts<C: LlmClient + ?Sized, S: AsRef<str>>(
    client: &C,
    concepts: &[S],
) -> Result<ConceptTermSet> {
    let task = Task::SearchTerms;
    wrap_failure(task, {
        run_task(client, task, build_search_terms_prompt(concepts))
            .map(|c| parse_search_terms_all(&c.content, concepts))
    })
}

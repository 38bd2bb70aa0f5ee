use serde::{Deserialize, Serialize};

use crate::types::PicoRecord;

/// The four-label reply format the PICO parser reads
const PICO_OUTPUT_FORMAT: &str = "Population: Population\n\
Intervention: Intervention\n\
Comparison: Comparison\n\
Outcome: Outcome";

const REFINED_PICO_OUTPUT_FORMAT: &str = "Population: Refined Population\n\
Intervention: Refined Intervention\n\
Comparison: Refined Comparison\n\
Outcome: Refined Outcome";

/// Block format the search-term parser reads
const SEARCH_TERMS_OUTPUT_FORMAT: &str = "Concept: Concept Name\n\
MeSH Terms:\n- MeSH term 1\n- MeSH term 2\n...\n\
Text Terms:\n- Text term 1\n- Text term 2\n...";

/// Generation tasks behind the four entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    PicoFromTitle,
    RefinePico,
    ConceptsFromPico,
    SearchTerms,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::PicoFromTitle => "pico_from_title",
            Task::RefinePico => "refine_pico",
            Task::ConceptsFromPico => "concepts_from_pico",
            Task::SearchTerms => "search_terms",
        }
    }

    /// System role text sent alongside the task's prompt
    pub fn system_prompt(self) -> &'static str {
        match self {
            Task::PicoFromTitle => {
                "You are an assistant that extracts PICO elements from research titles."
            }
            Task::RefinePico => {
                "You are an assistant that refines PICO elements for clarity and specificity."
            }
            Task::ConceptsFromPico => {
                "You are an assistant that extracts key concepts from PICO elements."
            }
            Task::SearchTerms => {
                "You are an assistant that generates MeSH terms and Text terms for medical concepts."
            }
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Task::SearchTerms => 0.3,
            _ => 0.5,
        }
    }

    /// Term lists for several concepts need a much longer reply
    pub fn max_tokens(self) -> u32 {
        match self {
            Task::SearchTerms => 3000,
            _ => 500,
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Task::PicoFromTitle => {
                "An error occurred while generating PICO elements from the title."
            }
            Task::RefinePico => "An error occurred while refining the PICO elements.",
            Task::ConceptsFromPico => {
                "An error occurred while generating concepts from the PICO elements."
            }
            Task::SearchTerms => "An error occurred while generating search terms.",
        }
    }
}

/// Build the prompt that derives PICO elements from a research title
pub fn build_pico_from_title_prompt(title: &str) -> String {
    format!(
        "Develop and create relevant PICO elements (Population, Intervention, Comparison, Outcome) \
from the following research title:\n\n\"{title}\"\n\n\
If the title does not provide enough to complete a PICO, please be creative and relevant. \
Provide each element labeled accordingly, and only provide the PICO elements \
in the following format:\n\n{PICO_OUTPUT_FORMAT}"
    )
}

/// Build the prompt that asks for a clearer, more specific version of a PICO
pub fn build_refine_pico_prompt(pico: &PicoRecord) -> String {
    format!(
        "Refine the following PICO elements for clarity and specificity. \
Provide each element labeled accordingly, and only provide the PICO elements \
in the following format:\n\n{REFINED_PICO_OUTPUT_FORMAT}\n\n\
PICO Elements:\n{pico}"
    )
}

/// Build the prompt that extracts ranked search concepts from a PICO
pub fn build_concepts_from_pico_prompt(pico: &PicoRecord) -> String {
    format!(
        "From the following PICO elements, extract between 3 to 6 key concepts that are highly relevant \
for developing an accurate and effective search strategy.\n\n\
Ensure that the concepts are distinct and do not overlap unnecessarily. \
If the 'Comparison' is simply 'placebo' or 'no intervention,' omit it as a key concept.\n\n\
Consider relevant search concepts and text words for developing search terms in databases like \
PubMed, MEDLINE, Cochrane, CINAHL, and Embase.\n\n\
{pico}\n\n\
Provide the concepts as a numbered list, and rank them in terms of their relevance to defining \
an accurate search strategy."
    )
}

/// Build the prompt that generates MeSH and text terms for every concept at once
pub fn build_search_terms_prompt<S: AsRef<str>>(concepts: &[S]) -> String {
    let concepts_text = concepts
        .iter()
        .enumerate()
        .map(|(idx, concept)| format!("{}. {}", idx + 1, concept.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "For each of the following concepts, generate a list of relevant MeSH terms and Text terms \
to develop a high quality search strategy.\n\
Provide the terms for each concept in the following format:\n\n\
{SEARCH_TERMS_OUTPUT_FORMAT}\n\n\
Here are the concepts:\n{concepts_text}\n\n\
Please ensure that the output is properly formatted as specified."
    )
}

//! PubMed boolean query assembly from generated search terms.

use crate::types::{ConceptTermSet, ConceptTerms};

const MESH_TAG: &str = "[Mesh]";
const TEXT_TAG: &str = "[tiab]";

fn tagged(term: &str, tag: &str) -> Option<String> {
    let term = term.replace('"', "");
    let term = term.trim();
    if term.is_empty() {
        None
    } else {
        Some(format!("\"{}\"{}", term, tag))
    }
}

/// OR-group for one concept, or `None` if it has no usable terms
pub fn concept_clause(terms: &ConceptTerms) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let mesh = terms.mesh_terms.iter().filter_map(|t| tagged(t, MESH_TAG));
    let text = terms.text_terms.iter().filter_map(|t| tagged(t, TEXT_TAG));
    for part in mesh.chain(text) {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("({})", parts.join(" OR ")))
    }
}

/// AND together one OR-group per concept, in concept order.
/// Concepts without terms are left out; an empty set gives an empty query.
pub fn build_boolean_query(terms: &ConceptTermSet) -> String {
    terms
        .iter()
        .filter_map(|(concept, t)| {
            let clause = concept_clause(t);
            if clause.is_none() {
                tracing::debug!(concept, "no terms for concept, leaving it out of the query");
            }
            clause
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

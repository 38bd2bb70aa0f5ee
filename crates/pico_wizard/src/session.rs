//! In-memory wizard state: which steps are done and what each produced.

use pico::{build_boolean_query, ConceptList, ConceptTermSet, PicoRecord};
use std::fmt;
use thiserror::Error;

/// Wizard steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Title,
    Pico,
    Concepts,
    SearchTerms,
    Query,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Title,
        Step::Pico,
        Step::Concepts,
        Step::SearchTerms,
        Step::Query,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Step::Title => "Title",
            Step::Pico => "PICO",
            Step::Concepts => "Concept Extraction",
            Step::SearchTerms => "Search Terms",
            Step::Query => "Search Query",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please enter a research title before proceeding.")]
    EmptyTitle,
    #[error("Please fill in all PICO elements before proceeding.")]
    IncompletePico,
    #[error("At least one concept is needed before proceeding.")]
    NoConcepts,
    #[error("No search terms to build a query from.")]
    NoSearchTerms,
    #[error("{0} is not the current step")]
    OutOfOrder(Step),
}

#[derive(Debug, Default)]
pub struct WizardSession {
    completed: Vec<Step>,
    pub title: String,
    pub pico: PicoRecord,
    /// Set once the model has filled in the PICO for the current title
    pub pico_generated: bool,
    pub concepts: ConceptList,
    pub terms: ConceptTermSet,
    /// What `concepts` were derived from, as of the last accept
    accepted_pico: Option<PicoRecord>,
    /// What `terms` were derived from, as of the last accept
    accepted_concepts: Option<ConceptList>,
}

impl WizardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, step: Step) -> bool {
        self.completed.contains(&step)
    }

    /// First step not yet completed, `None` when the wizard is finished
    pub fn current_step(&self) -> Option<Step> {
        Step::ALL.into_iter().find(|s| !self.is_completed(*s))
    }

    /// One line per step with its completion mark
    pub fn progress(&self) -> Vec<String> {
        Step::ALL
            .iter()
            .map(|s| {
                let mark = if self.is_completed(*s) { "✅" } else { "⬜" };
                format!("{} {}", mark, s)
            })
            .collect()
    }

    fn complete(&mut self, step: Step) -> Result<(), SessionError> {
        if self.current_step() != Some(step) {
            return Err(SessionError::OutOfOrder(step));
        }
        self.completed.push(step);
        Ok(())
    }

    pub fn complete_title(&mut self, title: &str) -> Result<(), SessionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SessionError::EmptyTitle);
        }
        self.set_title(title);
        self.complete(Step::Title)
    }

    /// Complete the title step without a title; the PICO is then entered by hand
    pub fn skip_title(&mut self) -> Result<(), SessionError> {
        self.set_title("");
        self.complete(Step::Title)
    }

    fn set_title(&mut self, title: &str) {
        if self.title != title {
            self.pico_generated = false;
            self.clear_concepts();
        }
        self.title = title.to_string();
    }

    fn clear_concepts(&mut self) {
        self.concepts.clear();
        self.accepted_pico = None;
        self.clear_terms();
    }

    fn clear_terms(&mut self) {
        self.terms = ConceptTermSet::new();
        self.accepted_concepts = None;
    }

    pub fn set_generated_pico(&mut self, pico: PicoRecord) {
        self.pico = pico;
        self.pico_generated = true;
    }

    pub fn complete_pico(&mut self) -> Result<(), SessionError> {
        if !self.pico.is_complete() {
            return Err(SessionError::IncompletePico);
        }
        self.complete(Step::Pico)?;
        if self.accepted_pico.as_ref() != Some(&self.pico) {
            self.clear_concepts();
            self.accepted_pico = Some(self.pico.clone());
        }
        Ok(())
    }

    pub fn complete_concepts(&mut self) -> Result<(), SessionError> {
        if self.concepts.is_empty() {
            return Err(SessionError::NoConcepts);
        }
        self.complete(Step::Concepts)?;
        if self.accepted_concepts.as_ref() != Some(&self.concepts) {
            self.clear_terms();
            self.accepted_concepts = Some(self.concepts.clone());
        }
        Ok(())
    }

    pub fn complete_search_terms(&mut self) -> Result<(), SessionError> {
        if self.terms.iter().all(|(_, t)| t.is_empty()) {
            return Err(SessionError::NoSearchTerms);
        }
        self.complete(Step::SearchTerms)
    }

    /// Current boolean query for the accepted terms
    pub fn query(&self) -> String {
        build_boolean_query(&self.terms)
    }

    pub fn complete_query(&mut self) -> Result<(), SessionError> {
        self.complete(Step::Query)
    }

    /// Reopen `step`; it and every later step become incomplete again
    pub fn go_back(&mut self, step: Step) {
        self.completed.retain(|s| *s < step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pico::ConceptTerms;

    fn complete_pico() -> PicoRecord {
        PicoRecord::new("Adults", "Drug X", "Placebo", "Survival")
    }

    #[test]
    fn test_new_session_starts_at_title() {
        let session = WizardSession::new();
        assert_eq!(session.current_step(), Some(Step::Title));
        assert_eq!(session.progress()[0], "⬜ Title");
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut session = WizardSession::new();
        assert_eq!(session.complete_title("   "), Err(SessionError::EmptyTitle));
        assert_eq!(session.current_step(), Some(Step::Title));
    }

    #[test]
    fn test_incomplete_pico_blocks() {
        let mut session = WizardSession::new();
        session.complete_title("Drug X in adults").unwrap();
        session.set_generated_pico(PicoRecord::new("Adults", "Drug X", "", "Survival"));

        assert_eq!(session.complete_pico(), Err(SessionError::IncompletePico));
        assert_eq!(session.current_step(), Some(Step::Pico));
    }

    #[test]
    fn test_full_walkthrough() {
        let mut session = WizardSession::new();
        session.complete_title("Drug X in adults").unwrap();
        session.set_generated_pico(complete_pico());
        session.complete_pico().unwrap();

        session.concepts = vec!["Adults".into(), "Drug X".into()];
        session.complete_concepts().unwrap();

        session.terms.insert(
            "Drug X",
            ConceptTerms {
                mesh_terms: vec!["Drug X".into()],
                text_terms: vec![],
            },
        );
        session.complete_search_terms().unwrap();
        assert_eq!(session.query(), r#"("Drug X"[Mesh])"#);

        session.complete_query().unwrap();
        assert_eq!(session.current_step(), None);
        assert!(session.progress().iter().all(|l| l.starts_with('✅')));
    }

    #[test]
    fn test_steps_complete_in_order() {
        let mut session = WizardSession::new();
        session.concepts = vec!["x".into()];
        assert_eq!(
            session.complete_concepts(),
            Err(SessionError::OutOfOrder(Step::Concepts))
        );
    }

    #[test]
    fn test_search_terms_need_some_terms() {
        let mut session = WizardSession::new();
        session.complete_title("t").unwrap();
        session.set_generated_pico(complete_pico());
        session.complete_pico().unwrap();
        session.concepts = vec!["x".into()];
        session.complete_concepts().unwrap();
        session.terms.insert("x", ConceptTerms::default());

        assert_eq!(session.complete_search_terms(), Err(SessionError::NoSearchTerms));
    }

    #[test]
    fn test_go_back_reopens_later_steps() {
        let mut session = WizardSession::new();
        session.complete_title("t").unwrap();
        session.set_generated_pico(complete_pico());
        session.complete_pico().unwrap();

        session.go_back(Step::Title);
        assert_eq!(session.current_step(), Some(Step::Title));
        assert!(!session.is_completed(Step::Pico));
        // Generated PICO survives until a different title is entered
        assert!(session.pico_generated);
        session.complete_title("another title").unwrap();
        assert!(!session.pico_generated);
    }

    fn accepted_through_concepts(title: &str) -> WizardSession {
        let mut session = WizardSession::new();
        session.complete_title(title).unwrap();
        session.set_generated_pico(complete_pico());
        session.complete_pico().unwrap();
        session.concepts = vec!["Aspirin".into(), "Stroke".into()];
        session.complete_concepts().unwrap();
        session
    }

    #[test]
    fn test_new_title_clears_concepts_and_terms() {
        let mut session = accepted_through_concepts("Aspirin for stroke prevention");
        session.terms.insert(
            "Aspirin",
            ConceptTerms {
                mesh_terms: vec!["Aspirin".into()],
                text_terms: vec![],
            },
        );

        session.go_back(Step::Title);
        session.complete_title("Exercise for depression").unwrap();
        assert!(session.concepts.is_empty());
        assert!(session.terms.is_empty());
        assert!(!session.pico_generated);
    }

    #[test]
    fn test_same_title_keeps_concepts() {
        let mut session = accepted_through_concepts("Aspirin for stroke prevention");
        session.go_back(Step::Title);
        session.complete_title("Aspirin for stroke prevention").unwrap();
        assert_eq!(session.concepts, vec!["Aspirin", "Stroke"]);
    }

    #[test]
    fn test_changed_pico_clears_concepts_and_terms() {
        let mut session = accepted_through_concepts("t");
        session.terms.insert(
            "Stroke",
            ConceptTerms {
                mesh_terms: vec!["Stroke".into()],
                text_terms: vec![],
            },
        );

        session.go_back(Step::Pico);
        session.pico.set(pico::PicoElement::Outcome, "Mortality");
        session.complete_pico().unwrap();
        assert!(session.concepts.is_empty());
        assert!(session.terms.is_empty());
        assert_eq!(session.current_step(), Some(Step::Concepts));
    }

    #[test]
    fn test_unchanged_pico_keeps_concepts() {
        let mut session = accepted_through_concepts("t");
        session.go_back(Step::Pico);
        session.complete_pico().unwrap();
        assert_eq!(session.concepts, vec!["Aspirin", "Stroke"]);
    }

    #[test]
    fn test_edited_concepts_clear_terms() {
        let mut session = accepted_through_concepts("t");
        session.terms.insert(
            "Stroke",
            ConceptTerms {
                mesh_terms: vec!["Stroke".into()],
                text_terms: vec![],
            },
        );

        session.go_back(Step::Concepts);
        session.concepts.push("Elderly".into());
        session.complete_concepts().unwrap();
        assert!(session.terms.is_empty());
    }

    #[test]
    fn test_skip_title_goes_to_pico_without_generation() {
        let mut session = WizardSession::new();
        session.skip_title().unwrap();
        assert_eq!(session.current_step(), Some(Step::Pico));
        assert!(session.title.is_empty());
        assert!(!session.pico_generated);

        session.pico = complete_pico();
        session.complete_pico().unwrap();
        assert_eq!(session.current_step(), Some(Step::Concepts));
    }
}

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{ConceptList, ConceptTermSet, ConceptTerms, PicoElement, PicoRecord};

// Pre-compiled regexes for performance
static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*|__").expect("invalid regex"));

static LEADING_BULLETS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*\s]*").expect("invalid regex"));

static PICO_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(population|intervention|comparison|outcome)\s*:\s*(.*)$")
        .expect("invalid regex")
});

/// One optional bullet, then one optional ordinal such as `1.` or `2)`
static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s*)?(?:\d+[.)]\s*)?").expect("invalid regex")
});

static CONCEPT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^concept\s*:\s*(.*)$").expect("invalid regex"));

static MESH_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^mesh\s*terms\s*:").expect("invalid regex"));

static TEXT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^text\s*terms\s*:").expect("invalid regex"));

/// Parse `Label: value` lines into a PICO record.
///
/// Markdown emphasis and leading bullets are ignored, labels match without
/// regard to case, and a label that appears twice keeps its last value.
pub fn parse_pico(text: &str) -> PicoRecord {
    let mut pico = PicoRecord::default();
    let text = EMPHASIS_RE.replace_all(text, "");

    for line in text.lines() {
        let line = LEADING_BULLETS_RE.replace(line.trim(), "");
        let Some(cap) = PICO_LINE_RE.captures(&line) else {
            continue;
        };
        if let Some(element) = PicoElement::from_label(&cap[1]) {
            pico.set(element, cap[2].trim());
        }
    }

    pico
}

/// Strip a single leading list marker (`1. `, `2) `, `- `, `• `, `- 3. `).
///
/// Applying it to already-stripped text is a no-op unless that text itself
/// starts with another marker.
pub fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Parse a numbered or bulleted list of concepts, one per line
pub fn parse_concepts(text: &str) -> ConceptList {
    text.lines()
        .map(|line| strip_list_marker(line).trim())
        .filter(|concept| !concept.is_empty())
        .map(str::to_string)
        .collect()
}

/// A line inside a concept block, after emphasis removal and trimming
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockLine<'a> {
    ConceptHeader(&'a str),
    MeshHeader,
    TextHeader,
    Bullet(&'a str),
    Other,
}

/// Classify one cleaned line of a search-terms reply
pub fn classify_line(line: &str) -> BlockLine<'_> {
    if let Some(cap) = CONCEPT_HEADER_RE.captures(line) {
        let name = cap.get(1).map_or("", |m| m.as_str());
        return BlockLine::ConceptHeader(name.trim());
    }
    if MESH_HEADER_RE.is_match(line) {
        return BlockLine::MeshHeader;
    }
    if TEXT_HEADER_RE.is_match(line) {
        return BlockLine::TextHeader;
    }
    // `*` is left out: a single asterisk usually opens italic commentary
    match line.strip_prefix('-') {
        Some(rest) => BlockLine::Bullet(rest.trim()),
        None => BlockLine::Other,
    }
}

/// Which term list bullet lines currently feed into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Section {
    #[default]
    NoSection,
    InMeshTerms,
    InTextTerms,
}

impl Section {
    /// Section headers switch lists; a new concept header resets; anything else keeps the state
    pub fn transition(self, line: &BlockLine<'_>) -> Section {
        match line {
            BlockLine::MeshHeader => Section::InMeshTerms,
            BlockLine::TextHeader => Section::InTextTerms,
            BlockLine::ConceptHeader(_) => Section::NoSection,
            BlockLine::Bullet(_) | BlockLine::Other => self,
        }
    }
}

fn clean_line(line: &str) -> String {
    EMPHASIS_RE.replace_all(line.trim(), "").trim().to_string()
}

fn concept_key(concept: &str) -> String {
    strip_list_marker(concept).trim().to_lowercase()
}

/// Split cleaned lines into blocks, each starting at a `Concept:` header.
/// Lines before the first header form a headerless leading block.
fn split_concept_blocks(lines: Vec<String>) -> Vec<Vec<String>> {
    let mut blocks: Vec<Vec<String>> = vec![Vec::new()];
    for line in lines {
        if CONCEPT_HEADER_RE.is_match(&line) {
            blocks.push(Vec::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks.retain(|b| !b.is_empty());
    blocks
}

/// Scan one block; returns the AI-provided concept name (if any) and its terms
fn parse_concept_block(lines: &[String]) -> Option<(String, ConceptTerms)> {
    let mut name: Option<String> = None;
    let mut terms = ConceptTerms::default();
    let mut section = Section::default();

    for line in lines {
        let kind = classify_line(line);
        match &kind {
            BlockLine::ConceptHeader(raw) => {
                name = Some(strip_list_marker(raw).trim().to_string());
            }
            BlockLine::Bullet(term) => match section {
                Section::InMeshTerms => terms.mesh_terms.push(term.to_string()),
                Section::InTextTerms => terms.text_terms.push(term.to_string()),
                Section::NoSection => {}
            },
            _ => {}
        }
        section = section.transition(&kind);
    }

    name.filter(|n| !n.is_empty()).map(|n| (n, terms))
}

/// Parse a multi-concept search-terms reply.
///
/// Concept names echoed back by the model are matched (ignoring case and
/// list markers) against `original_concepts` so the caller's own spelling is
/// used as the key. Names that match nothing are kept as the model wrote them.
pub fn parse_search_terms_all<S: AsRef<str>>(
    text: &str,
    original_concepts: &[S],
) -> ConceptTermSet {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lookup: HashMap<String, &str> = HashMap::new();
    for concept in original_concepts {
        let concept = concept.as_ref();
        lookup.entry(concept_key(concept)).or_insert(concept);
    }

    let lines = normalized.lines().map(clean_line).collect();
    let mut result = ConceptTermSet::new();

    for block in split_concept_blocks(lines) {
        let Some((ai_name, terms)) = parse_concept_block(&block) else {
            continue;
        };
        let key = match lookup.get(&concept_key(&ai_name)) {
            Some(original) => original.to_string(),
            None => {
                tracing::debug!(concept = %ai_name, "concept not among requested concepts, keeping model's name");
                ai_name
            }
        };
        result.insert(key, terms);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pico_plain() {
        let pico = parse_pico(
            "Population: Adults\nIntervention: Drug X\nComparison: Placebo\nOutcome: Survival",
        );
        assert_eq!(pico, PicoRecord::new("Adults", "Drug X", "Placebo", "Survival"));
    }

    #[test]
    fn test_parse_pico_empty() {
        assert_eq!(parse_pico(""), PicoRecord::default());
    }

    #[test]
    fn test_parse_pico_markdown_and_bullets() {
        let text = "Here are the elements:\n\n\
- **Population:** Adults with type 2 diabetes\n\
* __Intervention__: Metformin\n\
  - **Comparison**: Placebo\n\
**Outcome:** HbA1c reduction\n";
        let pico = parse_pico(text);
        assert_eq!(pico.population, "Adults with type 2 diabetes");
        assert_eq!(pico.intervention, "Metformin");
        assert_eq!(pico.comparison, "Placebo");
        assert_eq!(pico.outcome, "HbA1c reduction");
    }

    #[test]
    fn test_parse_pico_case_insensitive_and_crlf() {
        let pico = parse_pico("POPULATION : Children\r\noutcome:Growth\r\n");
        assert_eq!(pico.population, "Children");
        assert_eq!(pico.outcome, "Growth");
        assert_eq!(pico.intervention, "");
    }

    #[test]
    fn test_parse_pico_last_match_wins() {
        let pico = parse_pico("Population: first\nPopulation: second");
        assert_eq!(pico.population, "second");
    }

    #[test]
    fn test_parse_pico_empty_value() {
        let pico = parse_pico("Comparison:\nOutcome: Mortality");
        assert_eq!(pico.comparison, "");
        assert_eq!(pico.outcome, "Mortality");
    }

    #[test]
    fn test_parse_pico_ignores_unrelated_lines() {
        let pico = parse_pico("Populations are large\nNote: nothing here");
        assert_eq!(pico, PicoRecord::default());
    }

    #[test]
    fn test_parse_concepts_mixed_markers() {
        let concepts = parse_concepts("1. Diabetes\n2) Insulin therapy\n- Glycemic control");
        assert_eq!(concepts, vec!["Diabetes", "Insulin therapy", "Glycemic control"]);
    }

    #[test]
    fn test_parse_concepts_bullet_then_number() {
        let concepts = parse_concepts("• Obesity\n* 3. Exercise\n   10.   Weight loss  ");
        assert_eq!(concepts, vec!["Obesity", "Exercise", "Weight loss"]);
    }

    #[test]
    fn test_parse_concepts_skips_blank_and_keeps_duplicates() {
        let concepts = parse_concepts("1. Asthma\n\n   \n2. Asthma\n3.\n-");
        assert_eq!(concepts, vec!["Asthma", "Asthma"]);
    }

    #[test]
    fn test_strip_list_marker_strips_once() {
        assert_eq!(strip_list_marker("1. 2. Nested"), "2. Nested");
        assert_eq!(strip_list_marker("- - Twice"), "- Twice");
    }

    #[test]
    fn test_strip_list_marker_idempotent_on_stripped_text() {
        for text in ["Diabetes", "Insulin therapy", "5-HT receptors", "COVID-19"] {
            let once = strip_list_marker(text);
            assert_eq!(strip_list_marker(once), once);
            assert_eq!(once, text);
        }
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(
            classify_line("concept : Diabetes"),
            BlockLine::ConceptHeader("Diabetes")
        );
        assert_eq!(classify_line("MeSH Terms:"), BlockLine::MeshHeader);
        assert_eq!(classify_line("meshterms:"), BlockLine::MeshHeader);
        assert_eq!(classify_line("TEXT TERMS :"), BlockLine::TextHeader);
        assert_eq!(classify_line("- insulin"), BlockLine::Bullet("insulin"));
        assert_eq!(classify_line("-"), BlockLine::Bullet(""));
        assert_eq!(classify_line("*Note: check spelling*"), BlockLine::Other);
        assert_eq!(classify_line("• insulin"), BlockLine::Other);
        assert_eq!(classify_line("Some commentary"), BlockLine::Other);
        assert_eq!(classify_line(""), BlockLine::Other);
    }

    #[test]
    fn test_section_transitions() {
        let section = Section::NoSection;
        assert_eq!(section.transition(&BlockLine::Bullet("x")), Section::NoSection);

        let section = section.transition(&BlockLine::MeshHeader);
        assert_eq!(section, Section::InMeshTerms);
        assert_eq!(section.transition(&BlockLine::Other), Section::InMeshTerms);

        let section = section.transition(&BlockLine::TextHeader);
        assert_eq!(section, Section::InTextTerms);
        assert_eq!(
            section.transition(&BlockLine::ConceptHeader("Next")),
            Section::NoSection
        );
    }

    #[test]
    fn test_parse_search_terms_recovers_original_casing() {
        let text = "Concept: Diabetes\nMeSH Terms:\n- Diabetes Mellitus\nText Terms:\n- diabetic\n\
Concept: insulin\nMeSH Terms:\n- Insulin\nText Terms:\n- insulin therapy\n";
        let terms = parse_search_terms_all(text, &["Diabetes", "Insulin"]);

        assert_eq!(terms.concepts().collect::<Vec<_>>(), vec!["Diabetes", "Insulin"]);
        assert_eq!(terms.get("Insulin").unwrap().mesh_terms, vec!["Insulin"]);
    }

    #[test]
    fn test_parse_search_terms_section_counts() {
        let text = "Concept: Asthma\nMeSH Terms:\n- Asthma\n- Status Asthmaticus\nText Terms:\n- wheez*\n";
        let terms = parse_search_terms_all(text, &["Asthma"]);
        let asthma = terms.get("Asthma").unwrap();
        assert_eq!(asthma.mesh_terms.len(), 2);
        assert_eq!(asthma.text_terms, vec!["wheez*"]);
    }

    #[test]
    fn test_parse_search_terms_markdown_and_crlf() {
        let text = "Sure! Here are the terms.\r\n\r\n**Concept: 1. Heart Failure**\r\n**MeSH Terms:**\r\n- Heart Failure\r\n\r\n**Text Terms:**\r\n- cardiac failure\r\n- HF\r\n";
        let terms = parse_search_terms_all(text, &["1. Heart failure"]);

        assert_eq!(terms.len(), 1);
        let hf = terms.get("1. Heart failure").unwrap();
        assert_eq!(hf.mesh_terms, vec!["Heart Failure"]);
        assert_eq!(hf.text_terms, vec!["cardiac failure", "HF"]);
    }

    #[test]
    fn test_parse_search_terms_keeps_unknown_concepts() {
        let text = "Concept: Exercise\nMeSH Terms:\n- Exercise\n";
        let terms = parse_search_terms_all(text, &["Diabetes"]);
        assert_eq!(terms.concepts().collect::<Vec<_>>(), vec!["Exercise"]);
    }

    #[test]
    fn test_parse_search_terms_later_block_overwrites() {
        let text = "Concept: Diabetes\nMeSH Terms:\n- A\n- B\n\
Concept: Obesity\nMeSH Terms:\n- Obesity\n\
Concept: DIABETES\nText Terms:\n- C\n";
        let terms = parse_search_terms_all(text, &["Diabetes"]);

        assert_eq!(terms.concepts().collect::<Vec<_>>(), vec!["Diabetes", "Obesity"]);
        let diabetes = terms.get("Diabetes").unwrap();
        assert!(diabetes.mesh_terms.is_empty());
        assert_eq!(diabetes.text_terms, vec!["C"]);
    }

    #[test]
    fn test_parse_search_terms_bullets_before_section_ignored() {
        let text = "Concept: Stroke\n- stray\nMeSH Terms:\n- Stroke\n";
        let terms = parse_search_terms_all(text, &["Stroke"]);
        assert_eq!(
            terms.get("Stroke").unwrap(),
            &ConceptTerms {
                mesh_terms: vec!["Stroke".into()],
                text_terms: vec![],
            }
        );
    }

    #[test]
    fn test_parse_search_terms_italic_note_is_not_a_term() {
        let text = "Concept: Asthma\nText Terms:\n- wheeze\n*Note: adapt truncation per database*\n";
        let terms = parse_search_terms_all(text, &["Asthma"]);
        assert_eq!(terms.get("Asthma").unwrap().text_terms, vec!["wheeze"]);
    }

    #[test]
    fn test_parse_search_terms_bare_dash_appends_empty_term() {
        let terms = parse_search_terms_all("Concept: Asthma\nMeSH Terms:\n-\n- Asthma", &["Asthma"]);
        assert_eq!(terms.get("Asthma").unwrap().mesh_terms, vec!["", "Asthma"]);
    }

    #[test]
    fn test_parse_search_terms_header_only_block() {
        let terms = parse_search_terms_all("Concept: Sleep", &["Sleep"]);
        assert!(terms.get("Sleep").unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_terms_unstructured_input() {
        let text = "I'm sorry, I can't help with that.\nMeSH Terms:\n- orphan\nConcept:\n- x";
        let terms = parse_search_terms_all(text, &["Anything"]);
        assert!(terms.is_empty());
    }

    #[test]
    fn test_parse_search_terms_keys_trace_to_headers() {
        let text = "Intro line\nConcept: Alpha\nMeSH Terms:\n- a\nConcept: Beta\nText Terms:\n- b\nTrailing";
        let terms = parse_search_terms_all(text, &["alpha"]);
        for key in terms.concepts() {
            let traced = text
                .lines()
                .filter_map(|l| l.strip_prefix("Concept:"))
                .any(|name| name.trim().eq_ignore_ascii_case(key));
            assert!(traced, "{key} has no Concept: header");
        }
        assert_eq!(terms.concepts().collect::<Vec<_>>(), vec!["alpha", "Beta"]);
    }
}

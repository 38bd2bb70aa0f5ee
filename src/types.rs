use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{PicoError, Result};

/// One of the four PICO labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PicoElement {
    Population,
    Intervention,
    Comparison,
    Outcome,
}

impl PicoElement {
    /// All elements in their canonical order
    pub const ALL: [PicoElement; 4] = [
        PicoElement::Population,
        PicoElement::Intervention,
        PicoElement::Comparison,
        PicoElement::Outcome,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PicoElement::Population => "Population",
            PicoElement::Intervention => "Intervention",
            PicoElement::Comparison => "Comparison",
            PicoElement::Outcome => "Outcome",
        }
    }

    /// Case-insensitive label lookup
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for PicoElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Population / Intervention / Comparison / Outcome
///
/// All four fields are always present; a field the model left out is simply empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PicoRecord {
    #[serde(default)]
    pub population: String,
    #[serde(default)]
    pub intervention: String,
    #[serde(default)]
    pub comparison: String,
    #[serde(default)]
    pub outcome: String,
}

impl PicoRecord {
    pub fn new(
        population: impl Into<String>,
        intervention: impl Into<String>,
        comparison: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            population: population.into(),
            intervention: intervention.into(),
            comparison: comparison.into(),
            outcome: outcome.into(),
        }
    }

    pub fn get(&self, element: PicoElement) -> &str {
        match element {
            PicoElement::Population => &self.population,
            PicoElement::Intervention => &self.intervention,
            PicoElement::Comparison => &self.comparison,
            PicoElement::Outcome => &self.outcome,
        }
    }

    pub fn set(&mut self, element: PicoElement, value: impl Into<String>) {
        let slot = match element {
            PicoElement::Population => &mut self.population,
            PicoElement::Intervention => &mut self.intervention,
            PicoElement::Comparison => &mut self.comparison,
            PicoElement::Outcome => &mut self.outcome,
        };
        *slot = value.into();
    }

    /// True when every element holds non-whitespace text
    pub fn is_complete(&self) -> bool {
        PicoElement::ALL
            .iter()
            .all(|e| !self.get(*e).trim().is_empty())
    }
}

/// Renders the record as `Label: value` lines, the same shape the parser reads back
impl fmt::Display for PicoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in PicoElement::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", element.label(), self.get(*element))?;
        }
        Ok(())
    }
}

/// Concepts in the order the model ranked them
pub type ConceptList = Vec<String>;

/// MeSH and free-text terms generated for a single concept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptTerms {
    #[serde(rename = "MeSH Terms", default)]
    pub mesh_terms: Vec<String>,
    #[serde(rename = "Text Terms", default)]
    pub text_terms: Vec<String>,
}

impl ConceptTerms {
    pub fn is_empty(&self) -> bool {
        self.mesh_terms.is_empty() && self.text_terms.is_empty()
    }
}

/// Concept name to term lists, kept in the order concepts first appeared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptTermSet {
    entries: Vec<(String, ConceptTerms)>,
}

impl ConceptTermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert terms for a concept. An existing entry keeps its position but
    /// has its terms replaced wholesale.
    pub fn insert(&mut self, concept: impl Into<String>, terms: ConceptTerms) {
        let concept = concept.into();
        match self.entries.iter_mut().find(|(name, _)| *name == concept) {
            Some((_, existing)) => *existing = terms,
            None => self.entries.push((concept, terms)),
        }
    }

    pub fn get(&self, concept: &str) -> Option<&ConceptTerms> {
        self.entries
            .iter()
            .find(|(name, _)| name == concept)
            .map(|(_, terms)| terms)
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.get(concept).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConceptTerms)> {
        self.entries.iter().map(|(name, terms)| (name.as_str(), terms))
    }
}

impl FromIterator<(String, ConceptTerms)> for ConceptTermSet {
    fn from_iter<I: IntoIterator<Item = (String, ConceptTerms)>>(iter: I) -> Self {
        let mut set = ConceptTermSet::new();
        for (concept, terms) in iter {
            set.insert(concept, terms);
        }
        set
    }
}

impl Serialize for ConceptTermSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (concept, terms) in &self.entries {
            map.serialize_entry(concept, terms)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConceptTermSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TermSetVisitor;

        impl<'de> Visitor<'de> for TermSetVisitor {
            type Value = ConceptTermSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of concept names to term lists")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut set = ConceptTermSet::new();
                while let Some((concept, terms)) = access.next_entry::<String, ConceptTerms>()? {
                    set.insert(concept, terms);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(TermSetVisitor)
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }
}

/// Requested shape of the model's reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// A single prompt sent to the LLM collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Overrides the client's configured model
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            model: None,
            temperature: 0.0,
            max_tokens: None,
            response_format: ResponseFormat::Text,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }
}

/// Result of a single LM completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub usage: Option<Usage>,
    /// Parsed body when JSON output was requested and the reply was valid JSON
    pub json: Option<serde_json::Value>,
}

impl ChatCompletion {
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            json: None,
        }
    }
}

/// Connection settings for the LLM collaborator
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    /// Base URL for API (optional, for custom endpoints)
    pub base_url: Option<String>,
    /// API key (optional, can use env vars)
    pub api_key: Option<String>,
    /// Replaces every task's default temperature when set
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: None,
            api_key: None,
            temperature: None,
        }
    }
}

impl LlmConfig {
    pub const API_KEY_ENV: &'static str = "OPENAI_API_KEY";

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Resolve the API key from the config first, then `OPENAI_API_KEY`
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(std::env::var(Self::API_KEY_ENV).ok())
    }

    /// Resolve the API key using `env_key` as the environment fallback.
    ///
    /// Custom endpoints (Ollama, local servers) get a placeholder key since they
    /// usually don't check it.
    pub fn resolve_api_key_with(&self, env_key: Option<String>) -> Result<String> {
        let key = self
            .api_key
            .clone()
            .or(env_key)
            .filter(|k| !k.trim().is_empty());

        match key {
            Some(key) => Ok(key),
            None if self.base_url.is_some() => Ok("ollama".to_string()),
            None => Err(PicoError::MissingApiKey),
        }
    }
}

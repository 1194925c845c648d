//! aiterm_runtime_canned - Canned-response fallback runtime
//!
//! Answers prompts from a fixed keyword table instead of running a model.
//! It is only used when explicitly configured (`model.mode = "canned"`),
//! and it labels itself clearly so users know no model is involved.

use aiterm_runtime_api::{GenerationFailure, Generator, GeneratorKind};

const DEFAULT_RESPONSE: &str =
    "I'm running with canned responses only, so I can't really answer that. Load a model for real answers, or type 'help' for commands.";

const RESPONSES: &[(&str, &str)] = &[
    ("hello", "Hello! I'm the AI Terminal assistant, running in canned-response mode."),
    ("hi", "Hi there! I'm the AI Terminal assistant, running in canned-response mode."),
    ("how are you", "I'm just a program, but everything is working fine. Thanks for asking!"),
    ("your name", "I'm the AI Terminal assistant."),
    ("who are you", "I'm the AI Terminal assistant, a small front-end for local language models."),
    ("weather", "I can't check the weather. Canned mode has no access to the outside world."),
    ("joke", "Why do programmers prefer dark mode? Because light attracts bugs."),
    ("thanks", "You're welcome!"),
    ("thank you", "You're welcome!"),
    ("bye", "Goodbye! Type 'exit' to leave the terminal."),
];

/// Keyword lookup generator. Never fails.
pub struct CannedGenerator {
    responses: Vec<(Vec<String>, String)>,
    fallback: String,
}

impl CannedGenerator {
    pub fn new() -> Self {
        Self::with_responses(
            RESPONSES.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            DEFAULT_RESPONSE.to_string(),
        )
    }

    /// Build a generator from `(keyword phrase, response)` pairs, checked in order.
    pub fn with_responses<I>(responses: I, fallback: String) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let responses = responses
            .into_iter()
            .map(|(phrase, response)| (words(&phrase), response))
            .filter(|(phrase, _)| !phrase.is_empty())
            .collect();
        Self { responses, fallback }
    }

    pub fn respond(&self, prompt: &str) -> &str {
        let prompt_words = words(prompt);
        self.responses
            .iter()
            .find(|(phrase, _)| contains_phrase(&prompt_words, phrase))
            .map(|(_, response)| response.as_str())
            .unwrap_or(self.fallback.as_str())
    }
}

impl Default for CannedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for CannedGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Canned
    }

    fn name(&self) -> String {
        "canned responses".to_string()
    }

    fn generate(&mut self, prompt: &str) -> Result<String, GenerationFailure> {
        let response = self.respond(prompt);
        tracing::debug!("Canned response for {:?}: {:?}", prompt, response);
        Ok(response.to_string())
    }
}

/// Lower-cased words; apostrophes stay part of a word.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    phrase.len() <= haystack.len() && haystack.windows(phrase.len()).any(|window| window == phrase)
}

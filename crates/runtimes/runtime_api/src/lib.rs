//! aiterm_runtime_api - Generator traits and types
//!
//! This crate defines the contract between a model session and the
//! strategies that actually produce text. Each strategy (candle inference,
//! canned responses) implements [`Generator`], and is built from a model
//! path by a [`ModelLoader`].

use aiterm_core::InferenceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MODEL_NOT_LOADED: &str = "[Model not loaded]";
pub const TOKENIZATION_FAILED: &str = "[Tokenization failed]";
pub const PROMPT_DECODING_FAILED: &str = "[Prompt decoding failed]";
pub const DETOKENIZATION_FAILED: &str = "[Detokenization failed]";

/// Runtime status, as shown by the front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeStatus {
    Unloaded,
    Loading,
    Ready,
    Error,
}

/// What kind of strategy a generator is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorKind {
    Inference,
    Canned,
}

/// Per-prompt generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Upper bound on generated tokens
    pub max_tokens: usize,
    /// Context window requested; models may cap it further
    pub context_size: usize,
    /// `<= 0.0` means greedy
    pub temperature: f32,
    pub top_p: f32,
    pub seed: u64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&InferenceConfig::default())
    }
}

impl From<&InferenceConfig> for GenerationParams {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            max_tokens: config.max_tokens as usize,
            context_size: config.context_size as usize,
            temperature: config.temperature,
            top_p: config.top_p,
            seed: config.seed,
        }
    }
}

/// Why a model could not be loaded. The session stays unloaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read model file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("no tokenizer found for {0}")]
    TokenizerMissing(PathBuf),

    #[error("failed to load tokenizer {path}: {reason}")]
    Tokenizer { path: PathBuf, reason: String },

    #[error("failed to create inference context: {0}")]
    Context(String),

    #[error("inference backend unavailable: {0}")]
    Backend(String),

    #[error("a model is already loaded in this session")]
    AlreadyLoaded,

    #[error("this session has no model loader")]
    NoLoader,
}

/// A generation stage failed. Surfaced to users as a sentinel string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("model not loaded")]
    NotLoaded,

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("prompt decoding failed: {0}")]
    PromptDecoding(String),

    #[error("detokenization failed: {0}")]
    Detokenization(String),
}

impl GenerationFailure {
    pub fn sentinel(&self) -> &'static str {
        match self {
            GenerationFailure::NotLoaded => MODEL_NOT_LOADED,
            GenerationFailure::Tokenization(_) => TOKENIZATION_FAILED,
            GenerationFailure::PromptDecoding(_) => PROMPT_DECODING_FAILED,
            GenerationFailure::Detokenization(_) => DETOKENIZATION_FAILED,
        }
    }
}

/// A loaded, ready-to-use text generator.
///
/// Dropping the generator releases whatever model resources it holds.
pub trait Generator: Send {
    fn kind(&self) -> GeneratorKind;

    /// Human readable name, e.g. the model file name
    fn name(&self) -> String;

    /// Produce a response for `prompt`. Blocks until generation finishes.
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationFailure>;
}

/// Builds a [`Generator`] from a model file.
pub trait ModelLoader: Send {
    fn load(&self, path: &Path) -> Result<Box<dyn Generator>, LoadError>;
}

//! aiterm_runtime_candle - Candle-based inference runtime
//!
//! This crate provides GGUF model inference using HuggingFace's candle
//! library. Supports Metal (macOS) and CUDA (Linux/Windows) acceleration.

mod backend;
mod decode;
mod model;
mod sampling;

use aiterm_runtime_api::{GenerationParams, Generator, LoadError, ModelLoader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use backend::Backend;
pub use model::LoadedModel;

/// Loads GGUF models onto a shared [`Backend`].
pub struct CandleLoader {
    backend: Arc<Backend>,
    params: GenerationParams,
    tokenizer_path: Option<PathBuf>,
}

impl CandleLoader {
    pub fn new(backend: Arc<Backend>, params: GenerationParams) -> Self {
        Self {
            backend,
            params,
            tokenizer_path: None,
        }
    }

    /// Use this tokenizer.json instead of looking next to the model
    pub fn with_tokenizer(mut self, tokenizer_path: Option<PathBuf>) -> Self {
        self.tokenizer_path = tokenizer_path;
        self
    }
}

impl ModelLoader for CandleLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Generator>, LoadError> {
        let model = LoadedModel::load(
            path,
            self.tokenizer_path.as_deref(),
            Arc::clone(&self.backend),
            self.params.clone(),
        )?;
        tracing::info!("Model loaded successfully");
        Ok(Box::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_reports_missing_files() {
        let _guard = crate::backend::exclusive();
        let backend = Backend::acquire(false).unwrap();
        let loader = CandleLoader::new(backend, GenerationParams::default());
        let err = loader.load(Path::new("/no/such/model.gguf")).err().unwrap();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}

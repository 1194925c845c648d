use aiterm_runtime_api::{Generator, GeneratorKind, LoadError, ModelLoader, MODEL_NOT_LOADED};
use std::path::{Path, PathBuf};

/// Owns the lifecycle of one loaded generator.
///
/// A session starts unloaded and becomes loaded at most once; there is no
/// way back to unloaded short of dropping it. Dropping the session drops the
/// generator, which releases the model.
pub struct ModelSession {
    loader: Option<Box<dyn ModelLoader>>,
    generator: Option<Box<dyn Generator>>,
    model_path: Option<PathBuf>,
}

impl ModelSession {
    /// A session with nothing to load models with. Every load fails.
    pub fn new() -> Self {
        Self {
            loader: None,
            generator: None,
            model_path: None,
        }
    }

    pub fn with_loader(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Some(Box::new(loader)),
            generator: None,
            model_path: None,
        }
    }

    /// An already loaded session, e.g. for the canned fallback.
    pub fn with_generator(generator: impl Generator + 'static) -> Self {
        tracing::info!("Using generator: {}", generator.name());
        Self {
            loader: None,
            generator: Some(Box::new(generator)),
            model_path: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.generator.is_some()
    }

    /// Load the model at `path`.
    ///
    /// A second load on a loaded session is rejected and the current model
    /// stays in place. A failed load leaves the session unloaded.
    pub fn load_model(&mut self, path: &Path) -> Result<(), LoadError> {
        if self.generator.is_some() {
            tracing::warn!("Refusing to load {:?}: a model is already loaded", path);
            return Err(LoadError::AlreadyLoaded);
        }
        let loader = self.loader.as_ref().ok_or(LoadError::NoLoader)?;

        match loader.load(path) {
            Ok(generator) => {
                tracing::info!("Loaded {} from {:?}", generator.name(), path);
                self.generator = Some(generator);
                self.model_path = Some(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load model {:?}: {}", path, e);
                Err(e)
            }
        }
    }

    /// Generate a response. Never fails: problems come back as sentinel
    /// strings, and an unloaded session answers `"[Model not loaded]"`.
    pub fn generate(&mut self, prompt: &str) -> String {
        let Some(generator) = self.generator.as_mut() else {
            return MODEL_NOT_LOADED.to_string();
        };

        tracing::debug!("Generating for prompt {:?}", prompt);
        match generator.generate(prompt) {
            Ok(text) => text,
            Err(failure) => {
                tracing::warn!("Generation failed: {}", failure);
                failure.sentinel().to_string()
            }
        }
    }

    pub fn generator_name(&self) -> Option<String> {
        self.generator.as_ref().map(|g| g.name())
    }

    pub fn generator_kind(&self) -> Option<GeneratorKind> {
        self.generator.as_ref().map(|g| g.kind())
    }

    /// Path of the loaded model, if it came from a file
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}

impl Default for ModelSession {
    fn default() -> Self {
        Self::new()
    }
}

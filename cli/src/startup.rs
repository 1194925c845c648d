//! Session construction shared by both front-ends

use aiterm_core::{Config, GeneratorMode};
use aiterm_runtime_api::{GenerationParams, LoadError};
use aiterm_runtime_candle::{Backend, CandleLoader};
use aiterm_runtime_canned::CannedGenerator;
use aiterm_session::ModelSession;

/// Build the session selected by `model.mode`.
///
/// Canned sessions come back ready. Inference sessions come back unloaded,
/// holding a loader bound to the shared backend; the backend is acquired
/// here, once, and released when the session (and any model) is dropped.
pub fn build_session(config: &Config) -> Result<ModelSession, LoadError> {
    match config.model.mode {
        GeneratorMode::Canned => Ok(ModelSession::with_generator(CannedGenerator::new())),
        GeneratorMode::Inference => {
            let backend = Backend::acquire(config.inference.use_gpu)?;
            let loader = CandleLoader::new(backend, GenerationParams::from(&config.inference))
                .with_tokenizer(config.model.tokenizer_path.clone());
            Ok(ModelSession::with_loader(loader))
        }
    }
}

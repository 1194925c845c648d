//! GGUF model loading and inference

use aiterm_runtime_api::{GenerationFailure, GenerationParams, Generator, GeneratorKind, LoadError};
use candle_core::quantized::gguf_file;
use candle_core::Tensor;
use candle_transformers::models::quantized_llama::ModelWeights;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::backend::Backend;
use crate::decode::{decode_loop, DecodeLimits};
use crate::sampling::Sampler;

const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct LoadedModel {
    name: String,
    weights: ModelWeights,
    tokenizer: Tokenizer,
    stop_tokens: HashSet<u32>,
    context_size: usize,
    params: GenerationParams,
    // Keeps the device alive for as long as the weights live on it
    backend: Arc<Backend>,
}

impl LoadedModel {
    pub fn load(
        model_path: &Path,
        tokenizer_path: Option<&Path>,
        backend: Arc<Backend>,
        params: GenerationParams,
    ) -> Result<Self, LoadError> {
        tracing::info!("Loading model from {:?}", model_path);

        if !model_path.is_file() {
            return Err(LoadError::NotFound(model_path.to_path_buf()));
        }
        let tokenizer_path = find_tokenizer(model_path, tokenizer_path)?;
        tracing::info!("Tokenizer: {:?}", tokenizer_path);

        let mut file = File::open(model_path).map_err(|source| LoadError::Unreadable {
            path: model_path.to_path_buf(),
            source,
        })?;
        let content = gguf_file::Content::read(&mut file).map_err(|e| LoadError::Malformed {
            path: model_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let architecture = content
            .metadata
            .get("general.architecture")
            .and_then(|v| v.to_string().ok())
            .cloned()
            .unwrap_or_else(|| "llama".to_string());
        let model_context = content
            .metadata
            .get(&format!("{}.context_length", architecture))
            .and_then(|v| v.to_u32().ok())
            .map(|n| n as usize);
        let context_size = model_context
            .map(|n| n.min(params.context_size))
            .unwrap_or(params.context_size);
        tracing::info!(
            "Architecture: {}, {} tensors, context window {}",
            architecture,
            content.tensor_infos.len(),
            context_size
        );

        let weights = ModelWeights::from_gguf(content, &mut file, backend.device())
            .map_err(|e| LoadError::Context(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| LoadError::Tokenizer {
            path: tokenizer_path.clone(),
            reason: e.to_string(),
        })?;
        let stop_tokens = stop_tokens(&tokenizer);
        tracing::info!("Stop tokens: {:?}", stop_tokens);

        let name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.display().to_string());

        Ok(Self {
            name,
            weights,
            tokenizer,
            stop_tokens,
            context_size,
            params,
            backend,
        })
    }
}

impl Generator for LoadedModel {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Inference
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn generate(&mut self, prompt: &str) -> Result<String, GenerationFailure> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| GenerationFailure::Tokenization(e.to_string()))?;
        let prompt_tokens = encoding.get_ids();
        tracing::debug!("Prompt is {} tokens", prompt_tokens.len());

        let limits = DecodeLimits {
            max_tokens: self.params.max_tokens,
            context_size: self.context_size,
            stop_tokens: &self.stop_tokens,
        };
        let mut sampler = Sampler::new(self.params.temperature, self.params.top_p, self.params.seed);
        let device = self.backend.device();
        let weights = &mut self.weights;

        // index_pos 0 resets the KV cache, so every prompt starts fresh
        let generated = decode_loop(prompt_tokens, &limits, |tokens, index_pos| {
            let input = Tensor::new(tokens, device)?.unsqueeze(0)?;
            let logits = weights.forward(&input, index_pos)?;
            let logits = logits.squeeze(0)?;
            sampler.sample(&logits)
        })?;
        tracing::debug!("Generated {} tokens", generated.len());

        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| GenerationFailure::Detokenization(e.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationFailure::Detokenization("no text produced".to_string()));
        }
        Ok(text.to_string())
    }
}

/// EOS plus every special added token; generation stops on any of them.
fn stop_tokens(tokenizer: &Tokenizer) -> HashSet<u32> {
    let mut stop: HashSet<u32> = tokenizer
        .get_added_tokens_decoder()
        .iter()
        .filter(|(_, token)| token.special)
        .map(|(id, _)| *id)
        .collect();
    if let Some(eos) = get_eos_token_id(tokenizer) {
        stop.insert(eos);
    }
    stop
}

fn get_eos_token_id(tokenizer: &Tokenizer) -> Option<u32> {
    let vocab = tokenizer.get_vocab(true);
    vocab
        .get("</s>")
        .or_else(|| vocab.get("<|endoftext|>"))
        .or_else(|| vocab.get("<eos>"))
        .or_else(|| vocab.get("<|end|>"))
        .or_else(|| vocab.get("<|eot_id|>"))
        .copied()
}

/// The configured tokenizer, else `tokenizer.json` next to the model, else
/// `<model stem>.tokenizer.json`.
fn find_tokenizer(model_path: &Path, configured: Option<&Path>) -> Result<PathBuf, LoadError> {
    if let Some(path) = configured {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(LoadError::TokenizerMissing(path.to_path_buf()))
        };
    }

    let dir = model_path.parent().unwrap_or_else(|| Path::new("."));
    let direct = dir.join(TOKENIZER_FILE);
    if direct.is_file() {
        return Ok(direct);
    }

    if let Some(stem) = model_path.file_stem() {
        let named = dir.join(format!("{}.{}", stem.to_string_lossy(), TOKENIZER_FILE));
        if named.is_file() {
            return Ok(named);
        }
    }

    Err(LoadError::TokenizerMissing(model_path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn cpu_backend() -> Arc<Backend> {
        Backend::acquire(false).unwrap()
    }

    #[test]
    fn missing_model_is_not_found() {
        let _guard = crate::backend::exclusive();
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedModel::load(
            &dir.path().join("nope.gguf"),
            None,
            cpu_backend(),
            GenerationParams::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn missing_tokenizer_is_reported_before_reading_weights() {
        let _guard = crate::backend::exclusive();
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("tiny.gguf");
        fs::write(&model, b"definitely not gguf").unwrap();

        let err = LoadedModel::load(&model, None, cpu_backend(), GenerationParams::default())
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::TokenizerMissing(_)));
    }

    #[test]
    fn garbage_model_is_malformed() {
        let _guard = crate::backend::exclusive();
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("tiny.gguf");
        fs::write(&model, b"definitely not gguf").unwrap();
        fs::write(dir.path().join(TOKENIZER_FILE), b"{}").unwrap();

        let err = LoadedModel::load(&model, None, cpu_backend(), GenerationParams::default())
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Malformed { .. }), "{err}");
    }

    #[test]
    fn tokenizer_lookup_order() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("tiny.Q4_K_M.gguf");

        let named = dir.path().join("tiny.Q4_K_M.tokenizer.json");
        fs::write(&named, b"{}").unwrap();
        assert_eq!(find_tokenizer(&model, None).unwrap(), named);

        let direct = dir.path().join(TOKENIZER_FILE);
        fs::write(&direct, b"{}").unwrap();
        assert_eq!(find_tokenizer(&model, None).unwrap(), direct);

        let configured = dir.path().join("custom.json");
        assert!(matches!(
            find_tokenizer(&model, Some(&configured)),
            Err(LoadError::TokenizerMissing(_))
        ));
        fs::write(&configured, b"{}").unwrap();
        assert_eq!(find_tokenizer(&model, Some(&configured)).unwrap(), configured);
    }
}

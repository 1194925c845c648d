use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model file and generator selection
    #[serde(default)]
    pub model: ModelConfig,

    /// Inference settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Front-end settings
    #[serde(default)]
    pub interface: InterfaceConfig,
}

/// Which generator answers prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Real inference against a local GGUF model
    #[default]
    Inference,
    /// Keyword lookup in a fixed table, no model involved
    Canned,
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorMode::Inference => write!(f, "inference"),
            GeneratorMode::Canned => write!(f, "canned"),
        }
    }
}

impl FromStr for GeneratorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inference" => Ok(GeneratorMode::Inference),
            "canned" => Ok(GeneratorMode::Canned),
            other => anyhow::bail!("Unknown generator mode: {} (expected inference or canned)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model file tried first
    #[serde(default = "default_model_path")]
    pub default_path: PathBuf,

    /// Directory searched when the default model is missing
    #[serde(default = "default_search_dir")]
    pub search_dir: PathBuf,

    /// Model file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// tokenizer.json to use instead of the one next to the model
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,

    #[serde(default)]
    pub mode: GeneratorMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Generation budget per prompt, in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Context window, capped by what the model supports
    #[serde(default = "default_context_size")]
    pub context_size: u32,

    /// 0.0 selects greedy sampling
    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Use GPU acceleration (Metal on macOS, CUDA on Linux)
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Written once when the interaction loop ends
    #[serde(default = "default_farewell")]
    pub farewell: String,

    /// Input prompt of the chat variant
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("../external/llama.cpp/models/tinyllama-1.1b-chat-v1.0.Q4_K_M.gguf")
}

fn default_search_dir() -> PathBuf {
    PathBuf::from("../external/llama.cpp/models")
}

fn default_extension() -> String {
    "gguf".to_string()
}

fn default_max_tokens() -> u32 {
    128
}

fn default_context_size() -> u32 {
    2048
}

fn default_top_p() -> f32 {
    0.9
}

fn default_seed() -> u64 {
    42
}

fn default_use_gpu() -> bool {
    true
}

fn default_farewell() -> String {
    "Goodbye!".to_string()
}

fn default_prompt() -> String {
    "> ".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            inference: InferenceConfig::default(),
            interface: InterfaceConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_path: default_model_path(),
            search_dir: default_search_dir(),
            extension: default_extension(),
            tokenizer_path: None,
            mode: GeneratorMode::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            context_size: default_context_size(),
            temperature: 0.0,
            top_p: default_top_p(),
            seed: default_seed(),
            use_gpu: default_use_gpu(),
        }
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            farewell: default_farewell(),
            prompt: default_prompt(),
        }
    }
}

impl Config {
    /// Get the base directory: ~/.config/aiterm/
    pub fn base_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("USERPROFILE").map(PathBuf::from))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".config").join("aiterm"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config file {:?}: {}", path, e))?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the config file path: ~/.config/aiterm/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Get the logs directory: ~/.config/aiterm/logs/
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.inference.max_tokens, 128);
        assert_eq!(config.inference.context_size, 2048);
        assert_eq!(config.model.mode, GeneratorMode::Inference);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.model.mode = GeneratorMode::Canned;
        config.model.tokenizer_path = Some(PathBuf::from("/models/tokenizer.json"));
        config.inference.max_tokens = 64;
        config.interface.farewell = "Bye".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[model]\nmode = \"canned\"\n\n[inference]\ntemperature = 0.7\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model.mode, GeneratorMode::Canned);
        assert_eq!(config.model.extension, "gguf");
        assert_eq!(config.inference.temperature, 0.7);
        assert_eq!(config.inference.seed, 42);
        assert_eq!(config.interface, InterfaceConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[inference]\nmax_tokens = \"many\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn generator_mode_parses_case_insensitively() {
        assert_eq!("Canned".parse::<GeneratorMode>().unwrap(), GeneratorMode::Canned);
        assert_eq!("INFERENCE".parse::<GeneratorMode>().unwrap(), GeneratorMode::Inference);
        assert!("magic".parse::<GeneratorMode>().is_err());
    }
}

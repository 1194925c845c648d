//! aiterm_core - Core library shared by the aiterm front-ends
//!
//! This crate provides:
//! - The TOML configuration file and its defaults
//! - Model file resolution (default path, directory search, interactive prompt)

pub mod config;
pub mod resolve;

pub use config::{Config, GeneratorMode, InferenceConfig, InterfaceConfig, ModelConfig};
pub use resolve::{find_first_with_extension, resolve_model_path, NoPrompt, PathPrompt, Resolution};

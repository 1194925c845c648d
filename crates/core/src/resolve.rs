//! Locating a model file before it is handed to a session

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Outcome of [`resolve_model_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The configured default model exists
    Default(PathBuf),
    /// The default was missing; this file was found in the search directory
    Discovered(PathBuf),
    /// Nothing was found; the user supplied this path
    Chosen(PathBuf),
    /// Nothing was found and the user declined to pick a file
    NotChosen,
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Default(p) | Resolution::Discovered(p) | Resolution::Chosen(p) => Some(p),
            Resolution::NotChosen => None,
        }
    }

    /// Status lines a front-end shows while resolving, in order.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Resolution::Default(_) => Vec::new(),
            Resolution::Discovered(p) => vec![
                "Specific model not found, looking for alternatives...".to_string(),
                format!("Found alternative model: {}", p.display()),
            ],
            Resolution::Chosen(_) => vec![
                "Specific model not found, looking for alternatives...".to_string(),
                "No model files found in default location.".to_string(),
            ],
            Resolution::NotChosen => vec![
                "Specific model not found, looking for alternatives...".to_string(),
                "No model files found in default location.".to_string(),
                "No model selected. The application will work in limited mode.".to_string(),
            ],
        }
    }
}

/// Asks the user for a model path when none could be found.
pub trait PathPrompt {
    /// `Ok(None)` means the user chose nothing.
    fn ask(&mut self, extension: &str) -> Result<Option<PathBuf>>;
}

/// Prompt that never yields a path.
pub struct NoPrompt;

impl PathPrompt for NoPrompt {
    fn ask(&mut self, _extension: &str) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

pub fn resolve_model_path(
    default_path: &Path,
    search_dir: &Path,
    extension: &str,
    prompt: &mut dyn PathPrompt,
) -> Result<Resolution> {
    if default_path.exists() {
        return Ok(Resolution::Default(default_path.to_path_buf()));
    }

    tracing::info!("Default model {:?} not found, searching {:?}", default_path, search_dir);

    if let Some(found) = find_first_with_extension(search_dir, extension)? {
        tracing::info!("Found alternative model {:?}", found);
        return Ok(Resolution::Discovered(found));
    }

    match prompt.ask(extension)? {
        Some(path) => Ok(Resolution::Chosen(path)),
        None => Ok(Resolution::NotChosen),
    }
}

/// Lexicographically first regular file in `dir` whose extension matches,
/// ignoring case. A missing directory yields `None`.
pub fn find_first_with_extension(dir: &Path, extension: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            candidates.push(path);
        }
    }

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates.into_iter().next())
}

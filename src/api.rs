//! Library API for jarscope.
//!
//! The CLI commands print reports and return exit codes. These functions
//! return proper `Result` types instead, for callers embedding the engine.
//!
//! # Example
//!
//! ```no_run
//! use jarscope::analyze_model_file;
//! use std::path::Path;
//!
//! let result = analyze_model_file(Path::new("target/shop-model.json"))?;
//! println!("status: {}", result.status());
//! for cycle in result.cycles() {
//!     println!("{}", cycle.describe());
//! }
//! # Ok::<(), jarscope::JarscopeError>(())
//! ```

use crate::analysis::{AnalysisCoordinator, AnalysisError};
use crate::config::{Config, ConfigError};
use crate::fs::{FileSystem, default_fs};
use crate::model::{ArchitectureAnalysisResult, StructuralModel};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during jarscope operations.
#[derive(Debug, Error)]
pub enum JarscopeError {
    /// The specified path could not be found or resolved.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The structural model file is not valid JSON for a class list.
    #[error("Invalid structural model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The analysis was called with an unusable budget or input.
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// IO error while reading input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a structural model (class descriptors as JSON) from disk.
///
/// Both `{"name": .., "classes": [..]}` and a bare array of descriptors are
/// accepted.
pub fn load_model(path: &Path) -> Result<StructuralModel, JarscopeError> {
    load_model_with_fs(path, default_fs())
}

pub fn load_model_with_fs(
    path: &Path,
    fs: &dyn FileSystem,
) -> Result<StructuralModel, JarscopeError> {
    if !fs.exists(path) || fs.is_dir(path) {
        return Err(JarscopeError::PathNotFound(path.to_path_buf()));
    }
    let content = fs.read_to_string(path)?;
    let mut model =
        StructuralModel::from_json_str(&content).map_err(|source| JarscopeError::Model {
            path: path.to_path_buf(),
            source,
        })?;
    if model.name.is_empty() {
        model.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
    }
    debug!(path = %path.display(), classes = model.classes.len(), "loaded structural model");
    Ok(model)
}

/// Analyze an in-memory model with the budget and options from `config`.
///
/// # Example
///
/// ```no_run
/// use jarscope::{analyze_model, Config, StructuralModel};
///
/// let model = StructuralModel::from_json_str("[]")?;
/// let result = analyze_model(&model, &Config::default())?;
/// assert!(result.is_complete());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn analyze_model(
    model: &StructuralModel,
    config: &Config,
) -> Result<ArchitectureAnalysisResult, JarscopeError> {
    let coordinator = AnalysisCoordinator::new(config.analysis_options());
    Ok(coordinator.analyze(&model.classes, &config.analysis_budget())?)
}

/// Analyze a model file, picking up `.jarscope.toml` from the file's directory
/// when there is one.
pub fn analyze_model_file(path: &Path) -> Result<ArchitectureAnalysisResult, JarscopeError> {
    let config = Config::load(model_dir(path))?;
    analyze_model_file_with_config(path, &config)
}

/// Analyze a model file with an explicit configuration.
///
/// # Example
///
/// ```no_run
/// use jarscope::{analyze_model_file_with_config, Config};
/// use std::path::Path;
///
/// let mut config = Config::default();
/// config.budget.parallelism = 2;
/// config.budget.max_duration_ms = 10_000;
///
/// let result = analyze_model_file_with_config(Path::new("model.json"), &config)?;
/// if !result.is_complete() {
///     eprintln!("partial: {}", result.status());
/// }
/// # Ok::<(), jarscope::JarscopeError>(())
/// ```
pub fn analyze_model_file_with_config(
    path: &Path,
    config: &Config,
) -> Result<ArchitectureAnalysisResult, JarscopeError> {
    let model = load_model(path)?;
    analyze_model(&model, config)
}

/// Directory config is looked up in for a model file.
pub fn model_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

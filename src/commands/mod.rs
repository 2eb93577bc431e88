mod analyze;
mod init;

pub use analyze::{cmd_analyze, cmd_analyze_with_fs};
pub use init::{cmd_init, cmd_init_with_fs};

use crate::api::model_dir;
use crate::cli::AnalyzeArgs;
use crate::config::{Config, ConfigError};
use crate::fs::FileSystem;
use crate::style;
use std::path::PathBuf;

/// Shared context for command execution: the model to read and the effective
/// configuration after CLI overrides.
pub struct CommandContext {
    pub model: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// Returns Err(exit_code) if setup fails.
    pub fn new(args: &AnalyzeArgs, fs: &dyn FileSystem) -> Result<Self, i32> {
        if !fs.exists(&args.model) || fs.is_dir(&args.model) {
            style::error(&format!(
                "Model file not found: {}",
                style::path(&args.model)
            ));
            return Err(1);
        }

        let loaded = match &args.config {
            Some(path) => Config::load_file_with_fs(path, fs),
            None => Config::load_with_fs(model_dir(&args.model), fs),
        };
        let mut config = match loaded {
            Ok(config) => config,
            // An explicitly named config must load
            Err(e) if args.config.is_some() => {
                style::error(&format!("Failed to load config: {}", e));
                return Err(1);
            }
            Err(e) => {
                style::warning(&format!("Failed to load config: {}. Using defaults.", e));
                Config::default()
            }
        };

        if let Err(e) = apply_overrides(&mut config, args) {
            style::error(&e.to_string());
            return Err(1);
        }

        Ok(Self {
            model: args.model.clone(),
            config,
        })
    }
}

fn apply_overrides(config: &mut Config, args: &AnalyzeArgs) -> Result<(), ConfigError> {
    if let Some(parallelism) = args.parallelism {
        config.budget.parallelism = parallelism;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "--timeout-ms",
                message: "must be at least 1".to_string(),
            });
        }
        config.budget.max_duration_ms = timeout_ms;
    }
    if let Some(max_memory_mb) = args.max_memory_mb {
        if max_memory_mb == 0 {
            return Err(ConfigError::Invalid {
                key: "--max-memory-mb",
                message: "must be at least 1".to_string(),
            });
        }
        config.budget.max_memory_mb = max_memory_mb;
    }
    if let Some(kinds) = &args.cycle_kinds {
        config.cycles.edge_kinds = kinds.iter().copied().collect();
    }
    Ok(())
}

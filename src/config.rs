use crate::analysis::{
    AnalysisBudget, AnalysisOptions, BuildOptions, DEFAULT_MAX_GRAPH_ELEMENTS, DEFAULT_UNIT_SIZE,
    available_parallelism,
};
use crate::fs::{FileSystem, default_fs};
use crate::model::EdgeKind;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".jarscope.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub budget: BudgetConfig,
    pub build: BuildConfig,
    pub cycles: CycleConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    pub max_duration_ms: u64,
    pub max_memory_mb: u64,
    /// 0 means one worker per available core.
    pub parallelism: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub edge_kinds: BTreeSet<EdgeKind>,
    pub skip_platform_types: bool,
    pub unit_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    pub edge_kinds: BTreeSet<EdgeKind>,
    pub max_graph_elements: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    budget: Option<RawBudget>,
    build: Option<RawBuild>,
    cycles: Option<RawCycles>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBudget {
    max_duration_ms: Option<u64>,
    max_memory_mb: Option<u64>,
    parallelism: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    edge_kinds: Option<Vec<String>>,
    skip_platform_types: Option<bool>,
    unit_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCycles {
    edge_kinds: Option<Vec<String>>,
    max_graph_elements: Option<usize>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: 300_000,
            max_memory_mb: 2048,
            parallelism: 0,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            edge_kinds: EdgeKind::ALL.into_iter().collect(),
            skip_platform_types: true,
            unit_size: DEFAULT_UNIT_SIZE,
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            edge_kinds: EdgeKind::structural().collect(),
            max_graph_elements: DEFAULT_MAX_GRAPH_ELEMENTS,
        }
    }
}

impl Config {
    /// Loads `.jarscope.toml` from `dir`, or defaults when there is none.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Self::load_with_fs(dir, default_fs())
    }

    pub fn load_with_fs(dir: &Path, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !fs.exists(&config_path) {
            return Ok(Self::default());
        }
        Self::load_file_with_fs(&config_path, fs)
    }

    pub fn load_file_with_fs(path: &Path, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let content = fs.read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let budget = match raw.budget {
            Some(b) => BudgetConfig {
                max_duration_ms: b.max_duration_ms.unwrap_or(defaults.budget.max_duration_ms),
                max_memory_mb: b.max_memory_mb.unwrap_or(defaults.budget.max_memory_mb),
                parallelism: b.parallelism.unwrap_or(defaults.budget.parallelism),
            },
            None => defaults.budget,
        };

        let build = match raw.build {
            Some(b) => BuildConfig {
                edge_kinds: match b.edge_kinds {
                    Some(kinds) => parse_edge_kinds("build.edge_kinds", &kinds)?,
                    None => defaults.build.edge_kinds,
                },
                skip_platform_types: b
                    .skip_platform_types
                    .unwrap_or(defaults.build.skip_platform_types),
                unit_size: b.unit_size.unwrap_or(defaults.build.unit_size),
            },
            None => defaults.build,
        };

        let cycles = match raw.cycles {
            Some(c) => CycleConfig {
                edge_kinds: match c.edge_kinds {
                    Some(kinds) => parse_edge_kinds("cycles.edge_kinds", &kinds)?,
                    None => defaults.cycles.edge_kinds,
                },
                max_graph_elements: c
                    .max_graph_elements
                    .unwrap_or(defaults.cycles.max_graph_elements),
            },
            None => defaults.cycles,
        };

        if build.unit_size == 0 {
            return Err(ConfigError::Invalid {
                key: "build.unit_size",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            budget,
            build,
            cycles,
        })
    }

    pub fn analysis_budget(&self) -> AnalysisBudget {
        let parallelism = match self.budget.parallelism {
            0 => available_parallelism(),
            n => n,
        };
        AnalysisBudget {
            max_duration: Duration::from_millis(self.budget.max_duration_ms),
            max_memory_bytes: self.budget.max_memory_mb.saturating_mul(1024 * 1024),
            parallelism,
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            build: BuildOptions {
                edge_kinds: self.build.edge_kinds.clone(),
                skip_platform_types: self.build.skip_platform_types,
            },
            cycle_kinds: self.cycles.edge_kinds.clone(),
            max_cycle_graph_elements: self.cycles.max_graph_elements,
            unit_size: self.build.unit_size,
            require_non_empty: false,
        }
    }
}

pub fn parse_edge_kinds(
    key: &'static str,
    names: &[String],
) -> Result<BTreeSet<EdgeKind>, ConfigError> {
    names
        .iter()
        .map(|name| {
            name.parse::<EdgeKind>()
                .map_err(|message| ConfigError::Invalid { key, message })
        })
        .collect()
}

/// Commented starter configuration with every key at its default.
pub fn generate_config_template() -> String {
    let all: Vec<String> = EdgeKind::ALL
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect();
    let structural: Vec<String> = EdgeKind::structural()
        .map(|k| format!("\"{}\"", k))
        .collect();

    format!(
        r#"# jarscope configuration

[budget]
# Wall-clock limit for dependency graph construction
max_duration_ms = 300000
# Ceiling for the estimated size of the merged graph
max_memory_mb = 2048
# Worker threads; 0 uses every available core
parallelism = 0

[build]
# Relationship kinds recorded in the class graph
edge_kinds = [{all}]
# Ignore java.*, javax.*, jdk.*, sun.* and com.sun.* types
skip_platform_types = true
# Classes handed to a worker at a time
unit_size = 256

[cycles]
# Relationship kinds followed when looking for circular dependencies
edge_kinds = [{structural}]
# Graphs with more nodes plus edges than this are not searched
max_graph_elements = 2000000
"#,
        all = all.join(", "),
        structural = structural.join(", "),
    )
}

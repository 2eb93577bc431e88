use crate::model::EdgeKind;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jarscope")]
#[command(about = "Dependency graphs, cycles and design metrics for Java archives")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Default tracing filter for the chosen verbosity. `RUST_LOG` wins when set.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "jarscope=warn",
            (false, 0) => "jarscope=info",
            (false, 1) => "jarscope=debug",
            (false, _) => "jarscope=trace",
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze a structural model exported from a JAR
    Analyze(AnalyzeArgs),

    /// Generate a starter .jarscope.toml configuration file
    Init(InitArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Structural model JSON (class descriptors)
    pub model: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "markdown")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to .jarscope.toml next to the model)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker threads for graph construction (0 = all cores)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Wall-clock budget for graph construction in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Memory ceiling for the merged graph in MiB
    #[arg(long)]
    pub max_memory_mb: Option<u64>,

    /// Edge kinds followed by cycle detection (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub cycle_kinds: Option<Vec<EdgeKind>>,

    /// Rows shown in the coupling and instability tables
    #[arg(long, default_value = "10")]
    pub top: usize,
}

impl AnalyzeArgs {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            format: OutputFormat::Markdown,
            output: None,
            config: None,
            parallelism: None,
            timeout_ms: None,
            max_memory_mb: None,
            cycle_kinds: None,
            top: 10,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Directory where to create .jarscope.toml (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

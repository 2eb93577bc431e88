pub mod analysis;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod fs;
pub mod model;
pub mod output;
pub mod style;

pub use analysis::{
    AnalysisBudget, AnalysisCoordinator, AnalysisError, AnalysisOptions, BuildOptions,
    CycleDetector, DependencyGraph, GraphBuilder, analyze, compute_metrics, detect_cycles,
};
pub use api::{
    JarscopeError, analyze_model, analyze_model_file, analyze_model_file_with_config, load_model,
};
pub use cli::Cli;
pub use commands::{cmd_analyze, cmd_init};
pub use config::Config;
pub use model::{
    AnalysisStatus, ArchitectureAnalysisResult, CircularDependency, ClassDescriptor, EdgeKind,
    GraphLevel, NodeId, NodeMetrics, Severity, StructuralModel,
};

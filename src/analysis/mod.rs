mod budget;
mod builder;
mod circular;
mod cohesion;
mod complexity;
mod coordinator;
mod coupling;
mod graph;
mod metrics;
mod resolve;

pub use budget::{
    AnalysisBudget, DEFAULT_MAX_DURATION, DEFAULT_MAX_MEMORY_BYTES, available_parallelism,
};
pub use builder::{BuildOptions, GraphBuilder, build_graph};
pub use circular::{CycleDetection, CycleDetector, DEFAULT_MAX_GRAPH_ELEMENTS, detect_cycles};
pub use cohesion::{class_lcom, package_lcom};
pub use complexity::{
    BytecodeError, class_complexity, count_branch_points, fallback_complexity, method_complexity,
};
pub use coordinator::{
    AnalysisCoordinator, AnalysisError, AnalysisOptions, DEFAULT_UNIT_SIZE, analyze,
};
pub use coupling::{Coupling, coupling};
pub use graph::{DependencyGraph, GraphFragment, to_method_graph, to_package_graph};
pub use metrics::compute_metrics;
pub use resolve::{TypeParseError, TypeRef, class_name, erased_signature, is_platform_type};

mod class;
mod cycle;
mod dependency;
mod metrics;
mod structural;
mod warning;

pub use class::{
    ClassDescriptor, ClassKind, DEFAULT_PACKAGE, FieldDescriptor, FieldRef, MethodDescriptor,
    MethodRef, Modifiers, SizeHints, Visibility, method_id, method_signature, package_of,
};
pub use cycle::{CircularDependency, Severity};
pub use dependency::{
    DependencyEdge, DependencyNode, EdgeKey, EdgeKind, GraphLevel, NodeKind, NodeMetadata,
};
pub use metrics::{NodeId, NodeMetrics, distance, instability};
pub use structural::{StructuralModel, TypeIndex};
pub use warning::{AnalysisWarning, WarningKind};

use crate::analysis::DependencyGraph;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    /// Graph construction hit the wall-clock budget.
    PartialTimeout,
    /// The memory estimate or a graph-size ceiling was exceeded.
    PartialMemoryLimit,
}

impl AnalysisStatus {
    pub fn is_partial(self) -> bool {
        !matches!(self, AnalysisStatus::Complete)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Complete => write!(f, "complete"),
            AnalysisStatus::PartialTimeout => write!(f, "partial (time budget exceeded)"),
            AnalysisStatus::PartialMemoryLimit => write!(f, "partial (memory budget exceeded)"),
        }
    }
}

/// Everything one analysis run produced. Built once by the coordinator and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ArchitectureAnalysisResult {
    pub(crate) class_graph: DependencyGraph,
    pub(crate) package_graph: DependencyGraph,
    pub(crate) method_graph: DependencyGraph,
    pub(crate) cycles: Vec<CircularDependency>,
    pub(crate) metrics: BTreeMap<NodeId, NodeMetrics>,
    pub(crate) status: AnalysisStatus,
    pub(crate) warnings: Vec<AnalysisWarning>,
    pub(crate) stats: AnalysisStats,
}

/// Bookkeeping about how much of the input was processed.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AnalysisStats {
    pub classes_supplied: usize,
    pub classes_analyzed: usize,
    pub classes_skipped: usize,
    pub units_total: usize,
    pub units_merged: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl ArchitectureAnalysisResult {
    pub fn class_graph(&self) -> &DependencyGraph {
        &self.class_graph
    }

    pub fn package_graph(&self) -> &DependencyGraph {
        &self.package_graph
    }

    pub fn method_graph(&self) -> &DependencyGraph {
        &self.method_graph
    }

    pub fn graph(&self, level: GraphLevel) -> &DependencyGraph {
        match level {
            GraphLevel::ClassLevel => &self.class_graph,
            GraphLevel::PackageLevel => &self.package_graph,
            GraphLevel::MethodLevel => &self.method_graph,
        }
    }

    pub fn cycles(&self) -> &[CircularDependency] {
        &self.cycles
    }

    pub fn cycles_at(&self, level: GraphLevel) -> impl Iterator<Item = &CircularDependency> {
        self.cycles.iter().filter(move |c| c.level == level)
    }

    pub fn metrics(&self) -> &BTreeMap<NodeId, NodeMetrics> {
        &self.metrics
    }

    pub fn metrics_for(&self, id: &NodeId) -> Option<&NodeMetrics> {
        self.metrics.get(id)
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        !self.status.is_partial()
    }

    /// Per-class warnings, sorted by kind, class and message.
    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    pub fn has_critical_cycles(&self) -> bool {
        self.cycles.iter().any(|c| c.severity == Severity::Critical)
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

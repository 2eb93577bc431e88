use crate::analysis::{
    AnalysisBudget, BuildOptions, CycleDetector, DEFAULT_MAX_GRAPH_ELEMENTS, GraphBuilder,
    GraphFragment, compute_metrics,
};
use crate::model::{
    AnalysisStats, AnalysisStatus, ArchitectureAnalysisResult, ClassDescriptor, EdgeKind,
    TypeIndex,
};
use crossbeam_channel::RecvTimeoutError;
use rayon::ThreadPoolBuildError;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

pub const DEFAULT_UNIT_SIZE: usize = 256;

/// Contract violations. Timeouts, memory pressure and bad descriptors are
/// reported through the result instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid analysis budget: {0}")]
    InvalidBudget(String),
    #[error("No classes to analyze")]
    EmptyInput,
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub build: BuildOptions,
    /// Edge kinds cycle detection follows.
    pub cycle_kinds: BTreeSet<EdgeKind>,
    /// Node plus edge count above which cycle detection is skipped.
    pub max_cycle_graph_elements: usize,
    /// Classes per work unit.
    pub unit_size: usize,
    /// Treat an empty class sequence as a caller error.
    pub require_non_empty: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            build: BuildOptions::default(),
            cycle_kinds: EdgeKind::structural().collect(),
            max_cycle_graph_elements: DEFAULT_MAX_GRAPH_ELEMENTS,
            unit_size: DEFAULT_UNIT_SIZE,
            require_non_empty: false,
        }
    }
}

/// Runs graph construction, cycle detection and metrics under a budget.
#[derive(Debug, Clone, Default)]
pub struct AnalysisCoordinator {
    options: AnalysisOptions,
}

struct Construction {
    fragment: GraphFragment,
    status: AnalysisStatus,
    units_total: usize,
    units_merged: usize,
}

impl AnalysisCoordinator {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn analyze(
        &self,
        classes: &[ClassDescriptor],
        budget: &AnalysisBudget,
    ) -> Result<ArchitectureAnalysisResult, AnalysisError> {
        budget.validate()?;
        if self.options.require_non_empty && classes.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let started = Instant::now();
        let span = info_span!("analyze", classes = classes.len());
        let _guard = span.enter();

        // Duration::MAX overflows Instant; no deadline then
        let deadline = started.checked_add(budget.max_duration);
        let builder = GraphBuilder::new(TypeIndex::new(classes), self.options.build.clone());
        let construction = self.construct(&builder, classes, budget, deadline)?;

        let mut status = construction.status;
        let classes_analyzed = construction.fragment.classes_analyzed();
        let classes_skipped = construction.fragment.classes_skipped();
        let (class_graph, mut warnings) = construction.fragment.into_graph();
        let package_graph = class_graph.to_package_graph();
        let method_graph = class_graph.to_method_graph();
        debug!(
            nodes = class_graph.node_count(),
            edges = class_graph.edge_count(),
            packages = package_graph.node_count(),
            "graphs built"
        );

        let detector = CycleDetector::new(self.options.cycle_kinds.iter().copied())
            .with_max_graph_elements(self.options.max_cycle_graph_elements);
        let class_cycles = detector.detect(&class_graph);
        let package_cycles = detector.detect(&package_graph);
        if (class_cycles.truncated || package_cycles.truncated) && !status.is_partial() {
            status = AnalysisStatus::PartialMemoryLimit;
        }
        let mut cycles = class_cycles.cycles;
        cycles.extend(package_cycles.cycles);

        // A partial graph only carries metrics for what was merged
        let measured: Cow<'_, [ClassDescriptor]> = if status.is_partial() {
            Cow::Owned(
                classes
                    .iter()
                    .filter(|c| {
                        class_graph
                            .node(c.name.trim())
                            .is_some_and(|n| n.is_merged())
                    })
                    .cloned()
                    .collect(),
            )
        } else {
            Cow::Borrowed(classes)
        };
        let mut metrics = compute_metrics(&class_graph, &measured);
        metrics.extend(compute_metrics(&package_graph, &measured));

        warnings.sort();
        let stats = AnalysisStats {
            classes_supplied: classes.len(),
            classes_analyzed,
            classes_skipped,
            units_total: construction.units_total,
            units_merged: construction.units_merged,
            elapsed: started.elapsed(),
        };

        info!(
            status = %status,
            cycles = cycles.len(),
            warnings = warnings.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "analysis finished"
        );

        Ok(ArchitectureAnalysisResult {
            class_graph,
            package_graph,
            method_graph,
            cycles,
            metrics,
            status,
            warnings,
            stats,
        })
    }

    /// Extracts work units on a bounded pool and merges fragments on the calling
    /// thread until all units are in or a limit is hit.
    fn construct(
        &self,
        builder: &GraphBuilder<'_>,
        classes: &[ClassDescriptor],
        budget: &AnalysisBudget,
        deadline: Option<Instant>,
    ) -> Result<Construction, AnalysisError> {
        let units: Vec<&[ClassDescriptor]> =
            classes.chunks(self.options.unit_size.max(1)).collect();
        let units_total = units.len();

        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(units_total, "time budget exhausted before graph construction");
            return Ok(Construction {
                fragment: GraphFragment::new(),
                status: AnalysisStatus::PartialTimeout,
                units_total,
                units_merged: 0,
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(budget.parallelism)
            .thread_name(|i| format!("jarscope-worker-{}", i))
            .build()?;
        let cancelled = AtomicBool::new(false);
        let (tx, rx) = crossbeam_channel::unbounded::<GraphFragment>();

        let (fragment, status, units_merged) = pool.in_place_scope(|scope| {
            for unit in &units {
                let tx = tx.clone();
                let cancelled = &cancelled;
                scope.spawn(move |_| {
                    // Queued units are dropped once a limit is hit
                    if cancelled.load(Ordering::Relaxed) {
                        return;
                    }
                    let fragment = builder.build_unit(unit);
                    // Fails once the merger has stopped; the fragment is dropped here
                    if !cancelled.load(Ordering::Relaxed) {
                        let _ = tx.send(fragment);
                    }
                });
            }
            drop(tx);

            let mut merged = GraphFragment::new();
            let mut units_merged = 0usize;
            let mut status = AnalysisStatus::Complete;

            loop {
                let received = match deadline {
                    Some(deadline) => rx.recv_deadline(deadline),
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match received {
                    Ok(fragment) => {
                        merged.merge(fragment);
                        units_merged += 1;
                        if merged.estimated_bytes() as u64 > budget.max_memory_bytes {
                            warn!(
                                estimated_bytes = merged.estimated_bytes(),
                                units_merged, "memory budget exceeded, stopping construction"
                            );
                            status = AnalysisStatus::PartialMemoryLimit;
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(units_merged, units_total, "time budget exceeded, stopping construction");
                        status = AnalysisStatus::PartialTimeout;
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            cancelled.store(true, Ordering::Relaxed);
            // In-flight fragments are freed by their workers instead of queueing
            drop(rx);
            (merged, status, units_merged)
        });

        Ok(Construction {
            fragment,
            status,
            units_total,
            units_merged,
        })
    }
}

/// Analyzes `classes` with default options.
pub fn analyze(
    classes: &[ClassDescriptor],
    budget: &AnalysisBudget,
) -> Result<ArchitectureAnalysisResult, AnalysisError> {
    AnalysisCoordinator::default().analyze(classes, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FieldDescriptor, GraphLevel, MethodDescriptor, MethodRef, NodeId, NodeKind, WarningKind,
    };
    use std::time::Duration;

    fn class_name(i: usize, n: usize) -> String {
        let i = i % n;
        format!("p{}.C{}", i % 7, i)
    }

    // Class i holds class i+1 and calls class i+3, spread over seven packages
    fn chain(n: usize) -> Vec<ClassDescriptor> {
        (0..n)
            .map(|i| {
                let mut class = ClassDescriptor::new(class_name(i, n));
                class.fields.push(FieldDescriptor {
                    name: "next".to_string(),
                    type_name: class_name(i + 1, n),
                    ..Default::default()
                });
                let mut method = MethodDescriptor::new("touch");
                method.invocations.push(MethodRef {
                    owner: class_name(i + 3, n),
                    name: "touch".to_string(),
                    parameter_types: Vec::new(),
                });
                class.methods.push(method);
                class
            })
            .collect()
    }

    fn options(unit_size: usize) -> AnalysisOptions {
        AnalysisOptions {
            unit_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_run() {
        let classes = chain(40);
        let result = AnalysisCoordinator::new(options(8))
            .analyze(&classes, &AnalysisBudget::unlimited().with_parallelism(2))
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.stats().units_total, 5);
        assert_eq!(result.stats().units_merged, 5);
        assert_eq!(result.stats().classes_analyzed, 40);
        assert_eq!(result.class_graph().node_count(), 40);
        assert!(result.cycles_at(GraphLevel::ClassLevel).count() >= 1);
        assert_eq!(result.method_graph().node_count(), 40);
    }

    #[test]
    fn test_parallelism_does_not_change_output() {
        let classes = chain(120);
        let coordinator = AnalysisCoordinator::new(options(7));
        let serial = coordinator
            .analyze(&classes, &AnalysisBudget::unlimited().with_parallelism(1))
            .unwrap();
        let parallel = coordinator
            .analyze(&classes, &AnalysisBudget::unlimited().with_parallelism(4))
            .unwrap();

        assert_eq!(serial.class_graph(), parallel.class_graph());
        assert_eq!(serial.package_graph(), parallel.package_graph());
        assert_eq!(serial.metrics(), parallel.metrics());
        assert_eq!(serial.cycles(), parallel.cycles());
    }

    #[test]
    fn test_memory_ceiling_yields_partial_result() {
        let classes = chain(200);
        let budget = AnalysisBudget::unlimited()
            .with_parallelism(1)
            .with_max_memory_bytes(1);
        let result = AnalysisCoordinator::new(options(10))
            .analyze(&classes, &budget)
            .unwrap();

        assert_eq!(result.status(), AnalysisStatus::PartialMemoryLimit);
        assert!(result.stats().units_merged >= 1);
        assert!(result.stats().units_merged < result.stats().units_total);
        let graph = result.class_graph();
        assert!(
            graph
                .edges()
                .all(|e| graph.contains(&e.source) && graph.contains(&e.target))
        );
    }

    #[test]
    fn test_partial_metrics_cover_only_merged_classes() {
        let classes = chain(200);
        let budget = AnalysisBudget::unlimited()
            .with_parallelism(1)
            .with_max_memory_bytes(1);
        let result = AnalysisCoordinator::new(options(10))
            .analyze(&classes, &budget)
            .unwrap();
        let analyzed = result.stats().classes_analyzed;
        assert_eq!(analyzed, result.stats().units_merged * 10);

        // Targets of merged classes stay in the graph without their own edges
        let graph = result.class_graph();
        let reference_only: Vec<_> = graph
            .nodes()
            .filter(|n| n.metadata.is_reference_only)
            .collect();
        assert!(!reference_only.is_empty());
        for node in &reference_only {
            assert_eq!(graph.fan_out(&node.id), 0);
            assert!(result.metrics_for(&NodeId::class(node.id.clone())).is_none());
        }

        let class_metrics = result
            .metrics()
            .keys()
            .filter(|id| id.kind == NodeKind::Class)
            .count();
        assert_eq!(class_metrics, analyzed);
        assert_eq!(graph.nodes().filter(|n| n.is_merged()).count(), analyzed);

        let package_classes: usize = result
            .package_graph()
            .nodes()
            .map(|n| n.metadata.class_count)
            .sum();
        assert_eq!(package_classes, analyzed);
        for node in result.package_graph().nodes().filter(|n| !n.is_merged()) {
            assert!(result.metrics_for(&NodeId::package(node.id.clone())).is_none());
        }
    }

    #[test]
    fn test_cycle_ceiling_marks_partial() {
        let classes = chain(10);
        let opts = AnalysisOptions {
            max_cycle_graph_elements: 1,
            ..Default::default()
        };
        let result = AnalysisCoordinator::new(opts)
            .analyze(&classes, &AnalysisBudget::unlimited())
            .unwrap();
        assert_eq!(result.status(), AnalysisStatus::PartialMemoryLimit);
        assert!(result.cycles().is_empty());
        assert_eq!(result.class_graph().node_count(), 10);
    }

    #[test]
    fn test_contract_violations() {
        let coordinator = AnalysisCoordinator::new(AnalysisOptions {
            require_non_empty: true,
            ..Default::default()
        });
        assert!(matches!(
            coordinator.analyze(&[], &AnalysisBudget::default()),
            Err(AnalysisError::EmptyInput)
        ));
        assert!(matches!(
            coordinator.analyze(&chain(2), &AnalysisBudget::default().with_parallelism(0)),
            Err(AnalysisError::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_empty_input_is_complete_by_default() {
        let result = analyze(&[], &AnalysisBudget::default()).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.class_graph().node_count(), 0);
    }

    #[test]
    fn test_malformed_descriptor_is_reported_not_fatal() {
        let mut classes = chain(5);
        classes.push(ClassDescriptor::default());
        let result = analyze(&classes, &AnalysisBudget::default()).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.stats().classes_skipped, 1);
        assert!(
            result
                .warnings()
                .iter()
                .any(|w| w.kind == WarningKind::MalformedDescriptor)
        );
    }

    #[test]
    fn test_expired_deadline_is_partial_timeout() {
        let classes = chain(50);
        let budget = AnalysisBudget::default().with_max_duration(Duration::from_nanos(1));
        let result = analyze(&classes, &budget).unwrap();
        assert_eq!(result.status(), AnalysisStatus::PartialTimeout);
    }
}

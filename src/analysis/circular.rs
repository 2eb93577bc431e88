use crate::analysis::DependencyGraph;
use crate::model::{CircularDependency, EdgeKind};
use petgraph::algo::tarjan_scc;
use petgraph::visit::{DfsEvent, EdgeFiltered, EdgeRef, depth_first_search};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const DEFAULT_MAX_GRAPH_ELEMENTS: usize = 2_000_000;

/// Tarjan SCC over the edges of selected kinds. Each strongly connected
/// component with two or more members is reported once, as a whole.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    edge_kinds: BTreeSet<EdgeKind>,
    max_graph_elements: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleDetection {
    pub cycles: Vec<CircularDependency>,
    /// The graph exceeded the size ceiling and was not searched.
    pub truncated: bool,
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self {
            edge_kinds: EdgeKind::structural().collect(),
            max_graph_elements: DEFAULT_MAX_GRAPH_ELEMENTS,
        }
    }
}

impl CycleDetector {
    pub fn new(edge_kinds: impl IntoIterator<Item = EdgeKind>) -> Self {
        Self {
            edge_kinds: edge_kinds.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_max_graph_elements(mut self, max_graph_elements: usize) -> Self {
        self.max_graph_elements = max_graph_elements;
        self
    }

    pub fn edge_kinds(&self) -> &BTreeSet<EdgeKind> {
        &self.edge_kinds
    }

    pub fn detect(&self, graph: &DependencyGraph) -> CycleDetection {
        let inner = graph.graph();
        let considered = |kind: EdgeKind| self.edge_kinds.contains(&kind);

        let edge_count = inner
            .edge_references()
            .filter(|e| considered(e.weight().kind))
            .count();
        let elements = inner.node_count() + edge_count;
        if elements > self.max_graph_elements {
            warn!(
                level = %graph.level(),
                elements,
                ceiling = self.max_graph_elements,
                "graph too large for cycle detection"
            );
            return CycleDetection {
                cycles: Vec::new(),
                truncated: true,
            };
        }

        // Self-loops never form a reportable cycle, so they are filtered with the kinds
        let filtered = EdgeFiltered::from_fn(inner, |e| {
            e.source() != e.target() && considered(e.weight().kind)
        });

        let mut discovery = vec![usize::MAX; inner.node_count()];
        let mut next = 0usize;
        depth_first_search(&filtered, inner.node_indices(), |event| {
            if let DfsEvent::Discover(node, _) = event {
                discovery[node.index()] = next;
                next += 1;
            }
        });

        let mut components: Vec<Vec<_>> = tarjan_scc(&filtered)
            .into_iter()
            .filter(|scc| scc.len() >= 2)
            .collect();
        for component in &mut components {
            component.sort_by_key(|idx| discovery[idx.index()]);
        }
        components.sort_by_key(|component| discovery[component[0].index()]);

        let mut membership = vec![None; inner.node_count()];
        for (id, component) in components.iter().enumerate() {
            for idx in component {
                membership[idx.index()] = Some(id);
            }
        }

        let mut kinds = vec![BTreeSet::new(); components.len()];
        for edge in inner.edge_references() {
            if edge.source() == edge.target() || !considered(edge.weight().kind) {
                continue;
            }
            if let (Some(from), Some(to)) =
                (membership[edge.source().index()], membership[edge.target().index()])
            {
                if from == to {
                    kinds[from].insert(edge.weight().kind);
                }
            }
        }

        let cycles: Vec<CircularDependency> = components
            .into_iter()
            .zip(kinds)
            .map(|(component, kinds)| {
                let nodes = component
                    .into_iter()
                    .map(|idx| inner[idx].id.clone())
                    .collect();
                CircularDependency::new(nodes, kinds, graph.level())
            })
            .collect();

        debug!(level = %graph.level(), cycles = cycles.len(), "cycle detection finished");
        CycleDetection {
            cycles,
            truncated: false,
        }
    }
}

/// Detects cycles over the structural edge kinds with the default ceiling.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<CircularDependency> {
    CycleDetector::default().detect(graph).cycles
}

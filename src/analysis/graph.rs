use crate::model::{
    AnalysisWarning, DependencyEdge, DependencyNode, EdgeKey, EdgeKind, GraphLevel, NodeKind,
    NodeMetadata, package_of,
};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

// Rough per-entry heap cost used for the memory budget.
const NODE_OVERHEAD_BYTES: usize = 192;
const EDGE_OVERHEAD_BYTES: usize = 96;

/// Edges and nodes emitted by one work unit.
///
/// Fragments merge by adding counts per `(source, target, kind)`, so the merged
/// result does not depend on the order units finish in.
#[derive(Debug, Clone, Default)]
pub struct GraphFragment {
    nodes: BTreeMap<String, DependencyNode>,
    edges: BTreeMap<EdgeKey, u32>,
    methods: BTreeMap<String, DependencyNode>,
    invocations: BTreeMap<(String, String), u32>,
    warnings: Vec<AnalysisWarning>,
    classes_analyzed: usize,
    classes_skipped: usize,
    estimated_bytes: usize,
}

impl GraphFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node. A more complete node replaces a placeholder of the same
    /// id (external, then reference-only); otherwise the first insert wins.
    pub fn add_node(&mut self, node: DependencyNode) {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => {
                if node.completeness() > existing.completeness() {
                    *existing = node;
                }
            }
            None => {
                self.estimated_bytes += NODE_OVERHEAD_BYTES + node.id.len();
                self.nodes.insert(node.id.clone(), node);
            }
        }
    }

    pub fn add_edge(&mut self, key: EdgeKey, count: u32) {
        if count == 0 {
            return;
        }
        if !self.edges.contains_key(&key) {
            self.estimated_bytes += EDGE_OVERHEAD_BYTES + key.source.len() + key.target.len();
        }
        *self.edges.entry(key).or_insert(0) += count;
    }

    pub fn add_method(&mut self, node: DependencyNode) {
        if !self.methods.contains_key(&node.id) {
            self.estimated_bytes += NODE_OVERHEAD_BYTES + node.id.len();
            self.methods.insert(node.id.clone(), node);
        }
    }

    pub fn add_invocation(&mut self, caller: String, callee: String) {
        let key = (caller, callee);
        if !self.invocations.contains_key(&key) {
            self.estimated_bytes += EDGE_OVERHEAD_BYTES + key.0.len() + key.1.len();
        }
        *self.invocations.entry(key).or_insert(0) += 1;
    }

    pub fn warn(&mut self, warning: AnalysisWarning) {
        self.warnings.push(warning);
    }

    pub fn record_analyzed(&mut self) {
        self.classes_analyzed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.classes_skipped += 1;
    }

    pub fn merge(&mut self, other: GraphFragment) {
        for (_, node) in other.nodes {
            self.add_node(node);
        }
        for (key, count) in other.edges {
            self.add_edge(key, count);
        }
        for (_, method) in other.methods {
            self.add_method(method);
        }
        for (key, count) in other.invocations {
            if !self.invocations.contains_key(&key) {
                self.estimated_bytes += EDGE_OVERHEAD_BYTES + key.0.len() + key.1.len();
            }
            *self.invocations.entry(key).or_insert(0) += count;
        }
        self.warnings.extend(other.warnings);
        self.classes_analyzed += other.classes_analyzed;
        self.classes_skipped += other.classes_skipped;
    }

    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes
    }

    pub fn classes_analyzed(&self) -> usize {
        self.classes_analyzed
    }

    pub fn classes_skipped(&self) -> usize {
        self.classes_skipped
    }

    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    pub fn edge_count(&self, key: &EdgeKey) -> u32 {
        self.edges.get(key).copied().unwrap_or(0)
    }

    /// Freezes the accumulator into a class-level graph plus its warnings.
    pub fn into_graph(self) -> (DependencyGraph, Vec<AnalysisWarning>) {
        let mut graph = DependencyGraph::from_parts(GraphLevel::ClassLevel, self.nodes, self.edges);
        graph.methods = self.methods;
        graph.invocations = self.invocations;
        (graph, self.warnings)
    }
}

/// Dependency graph at one granularity.
///
/// Nodes and edges are inserted in sorted id order, so two graphs built from
/// the same node and edge multisets are identical index for index.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    level: GraphLevel,
    graph: DiGraph<DependencyNode, DependencyEdge>,
    node_indices: HashMap<String, NodeIndex>,
    // Method nodes and call pairs kept at class level for the method-level view
    methods: BTreeMap<String, DependencyNode>,
    invocations: BTreeMap<(String, String), u32>,
}

impl DependencyGraph {
    pub fn empty(level: GraphLevel) -> Self {
        Self::from_parts(level, BTreeMap::new(), BTreeMap::new())
    }

    /// Builds a graph from deduplicated nodes and counted edges. Edges whose
    /// endpoints are not in `nodes` are dropped.
    pub fn from_parts(
        level: GraphLevel,
        nodes: BTreeMap<String, DependencyNode>,
        edges: BTreeMap<EdgeKey, u32>,
    ) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_indices = HashMap::with_capacity(nodes.len());

        for (id, node) in nodes {
            let idx = graph.add_node(node);
            node_indices.insert(id, idx);
        }

        let mut dangling = 0usize;
        for (key, count) in edges {
            let (Some(&from), Some(&to)) =
                (node_indices.get(&key.source), node_indices.get(&key.target))
            else {
                dangling += 1;
                continue;
            };
            graph.add_edge(from, to, DependencyEdge::from_key(key, count));
        }
        if dangling > 0 {
            debug!(level = %level, dangling, "dropped edges with unknown endpoints");
        }

        Self {
            level,
            graph,
            node_indices,
            methods: BTreeMap::new(),
            invocations: BTreeMap::new(),
        }
    }

    pub fn level(&self) -> GraphLevel {
        self.level
    }

    pub fn graph(&self) -> &DiGraph<DependencyNode, DependencyEdge> {
        &self.graph
    }

    pub fn node_indices(&self) -> &HashMap<String, NodeIndex> {
        &self.node_indices
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.node_indices.get(id).map(|idx| &self.graph[*idx])
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.graph.node_weights()
    }

    /// Edges in `(source, target, kind)` order.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_weights()
    }

    pub fn edge(&self, source: &str, target: &str, kind: EdgeKind) -> Option<&DependencyEdge> {
        let from = *self.node_indices.get(source)?;
        let to = *self.node_indices.get(target)?;
        self.graph
            .edges_connecting(from, to)
            .map(|e| e.weight())
            .find(|e| e.kind == kind)
    }

    /// Distinct other nodes `id` depends on.
    pub fn dependencies(&self, id: &str) -> BTreeSet<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Distinct other nodes depending on `id`.
    pub fn dependents(&self, id: &str) -> BTreeSet<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    pub fn fan_in(&self, id: &str) -> usize {
        self.dependents(id).len()
    }

    pub fn fan_out(&self, id: &str) -> usize {
        self.dependencies(id).len()
    }

    fn neighbors(&self, id: &str, direction: Direction) -> BTreeSet<&str> {
        let Some(&idx) = self.node_indices.get(id) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .filter(|n| *n != idx)
            .map(|n| self.graph[n].id.as_str())
            .collect()
    }

    /// Method nodes recorded during class-level construction.
    pub fn methods(&self) -> impl Iterator<Item = &DependencyNode> {
        self.methods.values()
    }

    pub fn invocations(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.invocations
            .iter()
            .map(|((caller, callee), count)| (caller.as_str(), callee.as_str(), *count))
    }

    pub fn to_package_graph(&self) -> DependencyGraph {
        to_package_graph(self)
    }

    pub fn to_method_graph(&self) -> DependencyGraph {
        to_method_graph(self)
    }

    fn package_of_node(&self, idx: NodeIndex) -> String {
        let node = &self.graph[idx];
        node.metadata
            .owner
            .clone()
            .unwrap_or_else(|| package_of(&node.id).to_string())
    }
}

/// Rolls class-level edges up to packages. Edges between classes of the same
/// package are dropped; the rest keep their kind with counts summed.
pub fn to_package_graph(graph: &DependencyGraph) -> DependencyGraph {
    if graph.level == GraphLevel::PackageLevel {
        return graph.clone();
    }

    let mut nodes: BTreeMap<String, DependencyNode> = BTreeMap::new();
    let mut edges: BTreeMap<EdgeKey, u32> = BTreeMap::new();

    for idx in graph.graph.node_indices() {
        let class = &graph.graph[idx];
        if class.kind != NodeKind::Class {
            continue;
        }
        let package = graph.package_of_node(idx);
        let entry = nodes.entry(package.clone()).or_insert_with(|| {
            DependencyNode::new(
                package,
                NodeKind::Package,
                NodeMetadata {
                    is_external: true,
                    ..Default::default()
                },
            )
        });

        // Only merged classes count towards size and abstractness
        let meta = &mut entry.metadata;
        if class.is_merged() {
            meta.is_external = false;
            meta.is_reference_only = false;
            meta.class_count += 1;
            if class.metadata.is_abstract || class.metadata.is_interface {
                meta.abstract_class_count += 1;
            }
            meta.method_count += class.metadata.method_count;
            meta.field_count += class.metadata.field_count;
            meta.byte_count += class.metadata.byte_count;
        } else if class.metadata.is_reference_only && meta.class_count == 0 {
            meta.is_external = false;
            meta.is_reference_only = true;
        }
    }

    for edge in graph.graph.edge_references() {
        let source = graph.package_of_node(edge.source());
        let target = graph.package_of_node(edge.target());
        if source == target {
            continue;
        }
        let weight = edge.weight();
        *edges
            .entry(EdgeKey::new(source, target, weight.kind))
            .or_insert(0) += weight.count;
    }

    DependencyGraph::from_parts(GraphLevel::PackageLevel, nodes, edges)
}

/// Method-level view: one node per declared method, invocation edges between them.
pub fn to_method_graph(graph: &DependencyGraph) -> DependencyGraph {
    let nodes = graph.methods.clone();
    let edges = graph
        .invocations
        .iter()
        .filter(|((caller, callee), _)| nodes.contains_key(caller) && nodes.contains_key(callee))
        .map(|((caller, callee), count)| {
            (
                EdgeKey::new(caller.clone(), callee.clone(), EdgeKind::MethodInvocation),
                *count,
            )
        })
        .collect();

    DependencyGraph::from_parts(GraphLevel::MethodLevel, nodes, edges)
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.nodes().eq(other.nodes())
            && self.edges().eq(other.edges())
    }
}

#[derive(Serialize)]
struct GraphView<'a> {
    level: GraphLevel,
    nodes: Vec<&'a DependencyNode>,
    edges: Vec<&'a DependencyEdge>,
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GraphView {
            level: self.level,
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_node(id: &str) -> DependencyNode {
        DependencyNode::new(
            id,
            NodeKind::Class,
            NodeMetadata {
                owner: Some(package_of(id).to_string()),
                ..Default::default()
            },
        )
    }

    fn fragment(classes: &[&str], edges: &[(&str, &str, EdgeKind)]) -> GraphFragment {
        let mut fragment = GraphFragment::new();
        for id in classes {
            fragment.add_node(class_node(id));
        }
        for (source, target, kind) in edges {
            fragment.add_edge(EdgeKey::new(*source, *target, *kind), 1);
        }
        fragment
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = fragment(
            &["p.A", "p.B"],
            &[("p.A", "p.B", EdgeKind::MethodInvocation)],
        );
        let b = fragment(
            &["p.B", "q.C"],
            &[
                ("p.A", "p.B", EdgeKind::MethodInvocation),
                ("p.B", "q.C", EdgeKind::Composition),
            ],
        );

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);

        let (left, _) = ab.into_graph();
        let (right, _) = ba.into_graph();
        assert_eq!(left, right);
        assert_eq!(
            left.edge("p.A", "p.B", EdgeKind::MethodInvocation)
                .map(|e| e.count),
            Some(2)
        );
    }

    #[test]
    fn test_analyzed_node_replaces_external_placeholder() {
        let mut fragment = GraphFragment::new();
        fragment.add_node(DependencyNode::external_class("p.A", "p"));
        fragment.add_node(class_node("p.A"));
        fragment.add_node(DependencyNode::external_class("p.A", "p"));

        let (graph, _) = fragment.into_graph();
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.node("p.A").unwrap().metadata.is_external);
    }

    #[test]
    fn test_merged_node_replaces_reference_only_node() {
        let reference = DependencyNode::new(
            "p.B",
            NodeKind::Class,
            NodeMetadata {
                is_reference_only: true,
                owner: Some("p".to_string()),
                ..Default::default()
            },
        );
        let mut forward = GraphFragment::new();
        forward.add_node(reference.clone());
        forward.add_node(class_node("p.B"));
        let mut backward = GraphFragment::new();
        backward.add_node(class_node("p.B"));
        backward.add_node(reference.clone());
        backward.add_node(DependencyNode::external_class("p.B", "p"));

        let (left, _) = forward.into_graph();
        let (right, _) = backward.into_graph();
        assert_eq!(left, right);
        assert!(left.node("p.B").unwrap().is_merged());

        let mut only_reference = GraphFragment::new();
        only_reference.add_node(reference);
        only_reference.add_node(DependencyNode::external_class("p.B", "p"));
        let (graph, _) = only_reference.into_graph();
        assert!(graph.node("p.B").unwrap().metadata.is_reference_only);
    }

    #[test]
    fn test_package_rollup_counts_only_merged_classes() {
        let mut fragment = fragment(&["p.A"], &[("p.A", "p.B", EdgeKind::Composition)]);
        for (id, package) in [("p.B", "p"), ("q.C", "q")] {
            fragment.add_node(DependencyNode::new(
                id,
                NodeKind::Class,
                NodeMetadata {
                    is_reference_only: true,
                    is_interface: true,
                    method_count: 4,
                    owner: Some(package.to_string()),
                    ..Default::default()
                },
            ));
        }
        let (graph, _) = fragment.into_graph();
        let packages = graph.to_package_graph();

        let p = packages.node("p").unwrap();
        assert_eq!(p.metadata.class_count, 1);
        assert_eq!(p.metadata.abstract_class_count, 0);
        assert_eq!(p.metadata.method_count, 0);
        assert!(p.is_merged());

        let q = packages.node("q").unwrap();
        assert_eq!(q.metadata.class_count, 0);
        assert!(q.metadata.is_reference_only);
        assert!(!q.metadata.is_external);
    }

    #[test]
    fn test_dangling_edges_are_dropped() {
        let fragment = fragment(&["p.A"], &[("p.A", "p.Missing", EdgeKind::Import)]);
        let (graph, _) = fragment.into_graph();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_fan_in_and_out_ignore_self_loops_and_multi_edges() {
        let fragment = fragment(
            &["p.A", "p.B", "p.C"],
            &[
                ("p.A", "p.B", EdgeKind::Composition),
                ("p.A", "p.B", EdgeKind::MethodInvocation),
                ("p.C", "p.B", EdgeKind::Import),
                ("p.B", "p.B", EdgeKind::Composition),
            ],
        );
        let (graph, _) = fragment.into_graph();
        assert_eq!(graph.fan_in("p.B"), 2);
        assert_eq!(graph.fan_out("p.A"), 1);
        assert_eq!(graph.fan_out("p.B"), 0);
    }

    #[test]
    fn test_package_rollup_drops_intra_package_edges() {
        let fragment = fragment(
            &["p.A", "p.B", "q.C", "q.D"],
            &[
                ("p.A", "p.B", EdgeKind::MethodInvocation),
                ("p.A", "q.C", EdgeKind::MethodInvocation),
                ("p.B", "q.D", EdgeKind::MethodInvocation),
                ("q.C", "p.A", EdgeKind::Inheritance),
            ],
        );
        let (graph, _) = fragment.into_graph();
        let packages = graph.to_package_graph();

        assert_eq!(packages.level(), GraphLevel::PackageLevel);
        assert_eq!(packages.node_count(), 2);
        assert_eq!(packages.edge_count(), 2);
        assert_eq!(
            packages
                .edge("p", "q", EdgeKind::MethodInvocation)
                .map(|e| e.count),
            Some(2)
        );
        assert!(packages.edge("q", "p", EdgeKind::Inheritance).is_some());
        assert!(packages.edges().all(|e| e.source != e.target));
        assert_eq!(packages.node("p").unwrap().metadata.class_count, 2);
    }

    #[test]
    fn test_method_graph_keeps_only_known_methods() {
        let mut fragment = fragment(&["p.A"], &[]);
        for id in ["p.A#run()", "p.A#step()"] {
            fragment.add_method(DependencyNode::new(id, NodeKind::Method, NodeMetadata::default()));
        }
        fragment.add_invocation("p.A#run()".into(), "p.A#step()".into());
        fragment.add_invocation("p.A#run()".into(), "p.A#gone()".into());

        let (graph, _) = fragment.into_graph();
        let methods = graph.to_method_graph();
        assert_eq!(methods.node_count(), 2);
        assert_eq!(methods.edge_count(), 1);
    }

    #[test]
    fn test_memory_estimate_grows_only_for_new_entries() {
        let mut fragment = GraphFragment::new();
        fragment.add_node(class_node("p.A"));
        fragment.add_node(class_node("p.B"));
        fragment.add_edge(EdgeKey::new("p.A", "p.B", EdgeKind::Import), 1);
        let before = fragment.estimated_bytes();
        fragment.add_edge(EdgeKey::new("p.A", "p.B", EdgeKind::Import), 3);
        assert_eq!(fragment.estimated_bytes(), before);
        assert!(before > 0);
    }

    #[test]
    fn test_serializes_sorted_nodes_and_edges() {
        let fragment = fragment(&["p.B", "p.A"], &[("p.B", "p.A", EdgeKind::Import)]);
        let (graph, _) = fragment.into_graph();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["level"], "class_level");
        assert_eq!(json["nodes"][0]["id"], "p.A");
        assert_eq!(json["edges"][0]["count"], 1);
    }
}

use crate::analysis::{DependencyGraph, class_complexity, class_lcom, coupling, package_lcom};
use crate::model::{ClassDescriptor, NodeId, NodeKind, NodeMetrics};
use std::collections::{BTreeMap, HashMap};

/// Computes metrics for every analyzed node of `graph`.
///
/// Coupling comes from the graph at its own granularity. Complexity and
/// cohesion come from `classes`; a package aggregates the descriptors whose
/// package matches its id. External and reference-only nodes get no entry.
pub fn compute_metrics(
    graph: &DependencyGraph,
    classes: &[ClassDescriptor],
) -> BTreeMap<NodeId, NodeMetrics> {
    let mut by_name: HashMap<&str, &ClassDescriptor> = HashMap::new();
    let mut by_package: HashMap<&str, Vec<&ClassDescriptor>> = HashMap::new();
    for class in classes.iter().filter(|c| c.validate().is_ok()) {
        by_name.insert(class.name.trim(), class);
        by_package.entry(class.package_name()).or_default().push(class);
    }

    let mut metrics = BTreeMap::new();
    for node in graph.nodes().filter(|n| n.is_merged()) {
        let counts = coupling(graph, &node.id);
        let base = NodeMetrics::from_coupling(counts.afferent, counts.efferent);

        let node_metrics = match node.kind {
            NodeKind::Class => {
                let class = by_name.get(node.id.as_str());
                NodeMetrics {
                    cyclomatic_complexity: class.map_or(0, |c| class_complexity(c)),
                    lcom: class.map_or(0.0, |c| class_lcom(c)),
                    ..base
                }
            }
            NodeKind::Package => {
                let members = by_package
                    .get(node.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let meta = &node.metadata;
                let abstractness = (meta.class_count > 0)
                    .then(|| meta.abstract_class_count as f64 / meta.class_count as f64);
                NodeMetrics {
                    cyclomatic_complexity: members
                        .iter()
                        .map(|c| class_complexity(c))
                        .fold(0u32, u32::saturating_add),
                    lcom: package_lcom(members.iter().copied()),
                    ..base
                }
                .with_abstractness(abstractness)
            }
            NodeKind::Method => NodeMetrics {
                cyclomatic_complexity: node.metadata.complexity.unwrap_or(1),
                ..base
            },
        };

        metrics.insert(NodeId::new(node.kind, node.id.clone()), node_metrics);
    }

    metrics
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Granularity of a dependency node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Package,
    Class,
    Method,
}

/// Granularity of a whole dependency graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GraphLevel {
    PackageLevel,
    ClassLevel,
    MethodLevel,
}

/// Relationship kind carried by a dependency edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Inheritance,
    Implementation,
    Composition,
    Aggregation,
    Association,
    MethodInvocation,
    FieldAccess,
    Import,
    ExternalLibrary,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 9] = [
        EdgeKind::Inheritance,
        EdgeKind::Implementation,
        EdgeKind::Composition,
        EdgeKind::Aggregation,
        EdgeKind::Association,
        EdgeKind::MethodInvocation,
        EdgeKind::FieldAccess,
        EdgeKind::Import,
        EdgeKind::ExternalLibrary,
    ];

    /// Type-hierarchy relationships; any cycle containing one is critical.
    pub fn is_hierarchy(self) -> bool {
        matches!(self, EdgeKind::Inheritance | EdgeKind::Implementation)
    }

    /// Kinds used for cycle detection unless configured otherwise:
    /// everything except imports and external-library references.
    pub fn structural() -> impl Iterator<Item = EdgeKind> {
        Self::ALL
            .into_iter()
            .filter(|k| !matches!(k, EdgeKind::Import | EdgeKind::ExternalLibrary))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Inheritance => "inheritance",
            EdgeKind::Implementation => "implementation",
            EdgeKind::Composition => "composition",
            EdgeKind::Aggregation => "aggregation",
            EdgeKind::Association => "association",
            EdgeKind::MethodInvocation => "method_invocation",
            EdgeKind::FieldAccess => "field_access",
            EdgeKind::Import => "import",
            EdgeKind::ExternalLibrary => "external_library",
        }
    }
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Package => "package",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
        }
    }

    /// The node kind a graph of the given level is made of.
    pub fn for_level(level: GraphLevel) -> Self {
        match level {
            GraphLevel::PackageLevel => NodeKind::Package,
            GraphLevel::ClassLevel => NodeKind::Class,
            GraphLevel::MethodLevel => NodeKind::Method,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        EdgeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("Unknown edge kind: {}", s))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "package" => Ok(NodeKind::Package),
            "class" => Ok(NodeKind::Class),
            "method" => Ok(NodeKind::Method),
            _ => Err(format!("Unknown node kind: {}", s)),
        }
    }
}

impl fmt::Display for GraphLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphLevel::PackageLevel => write!(f, "package level"),
            GraphLevel::ClassLevel => write!(f, "class level"),
            GraphLevel::MethodLevel => write!(f, "method level"),
        }
    }
}

/// A node of a dependency graph, deduplicated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyNode {
    pub id: String,
    pub kind: NodeKind,
    pub metadata: NodeMetadata,
}

/// Denormalized facts the metrics engine reads without going back to descriptors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeMetadata {
    /// Referenced but not part of the analyzed set.
    pub is_external: bool,
    /// Analyzed class seen only as an edge target; its own unit was never merged.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_reference_only: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub method_count: usize,
    pub field_count: usize,
    /// Analyzed classes contained in a package node.
    pub class_count: usize,
    /// Abstract classes and interfaces contained in a package node.
    pub abstract_class_count: usize,
    /// Enclosing package for classes, declaring class for methods.
    pub owner: Option<String>,
    /// Cyclomatic complexity of a method node.
    pub complexity: Option<u32>,
    pub byte_count: u64,
}

impl DependencyNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, metadata: NodeMetadata) -> Self {
        Self {
            id: id.into(),
            kind,
            metadata,
        }
    }

    /// Node for a referenced type that is not part of the analyzed set.
    pub fn external_class(id: &str, package: &str) -> Self {
        Self::new(
            id,
            NodeKind::Class,
            NodeMetadata {
                is_external: true,
                owner: Some(package.to_string()),
                ..Default::default()
            },
        )
    }

    /// How much is known about the node: external placeholders first, then
    /// reference-only class nodes, then fully merged nodes.
    pub fn completeness(&self) -> u8 {
        if self.metadata.is_external {
            0
        } else if self.metadata.is_reference_only {
            1
        } else {
            2
        }
    }

    /// Whether the node's own dependencies were extracted and merged.
    pub fn is_merged(&self) -> bool {
        self.completeness() == 2
    }
}

/// Identity of an edge: one ordered pair per relationship kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Directed "depends on" edge with the number of occurrences merged into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub count: u32,
}

impl DependencyEdge {
    pub fn from_key(key: EdgeKey, count: u32) -> Self {
        Self {
            source: key.source,
            target: key.target,
            kind: key.kind,
            count,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

use crate::model::{EdgeKind, GraphLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A strongly connected group of nodes, reported as one circular dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircularDependency {
    /// Members in DFS discovery order; always at least two.
    pub nodes: Vec<String>,
    /// Relationship kinds on the edges between members.
    pub edge_kinds: BTreeSet<EdgeKind>,
    pub severity: Severity,
    pub level: GraphLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Classifies a cycle. Hierarchy edges win over length:
    /// inheritance or implementation makes any cycle critical.
    pub fn classify(length: usize, edge_kinds: &BTreeSet<EdgeKind>) -> Self {
        if edge_kinds.iter().any(|k| k.is_hierarchy()) {
            Severity::Critical
        } else if length > 5 {
            Severity::High
        } else if length >= 4 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl CircularDependency {
    pub fn new(nodes: Vec<String>, edge_kinds: BTreeSet<EdgeKind>, level: GraphLevel) -> Self {
        let severity = Severity::classify(nodes.len(), &edge_kinds);
        Self {
            nodes,
            edge_kinds,
            severity,
            level,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }

    /// `Order → Invoice → Order`; packages keep their full name.
    pub fn describe(&self) -> String {
        let mut path: Vec<String> = match self.level {
            GraphLevel::PackageLevel => self.nodes.clone(),
            _ => self.nodes.iter().map(|s| short_name(s)).collect(),
        };
        if let Some(first) = path.first().cloned() {
            path.push(first);
        }
        path.join(" → ")
    }
}

fn short_name(id: &str) -> String {
    match id.split_once('#') {
        Some((owner, signature)) => format!("{}#{}", simple_name(owner), signature),
        None => simple_name(id).to_string(),
    }
}

fn simple_name(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" | "med" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" | "crit" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

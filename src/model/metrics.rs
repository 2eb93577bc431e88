use crate::model::NodeKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Key of the metrics map. Class and package names may coincide, so the kind is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub kind: NodeKind,
    pub name: String,
}

impl NodeId {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Package, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Class, name)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Method, name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| format!("Node id without kind prefix: {}", s))?;
        Ok(Self::new(kind.parse()?, name))
    }
}

// Serialized as "kind:name" so maps keyed by NodeId stay valid JSON objects.
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Coupling, stability, complexity and cohesion figures for one node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeMetrics {
    /// Ca: distinct other nodes depending on this one.
    pub afferent: usize,
    /// Ce: distinct other nodes this one depends on.
    pub efferent: usize,
    /// Ce / (Ca + Ce), 0 for isolated nodes.
    pub instability: f64,
    /// Share of abstract types; package level only.
    pub abstractness: Option<f64>,
    /// |A + I - 1| / √2; present whenever abstractness is.
    pub distance: Option<f64>,
    pub cyclomatic_complexity: u32,
    /// Share of method pairs with no common field access, 0..=1.
    pub lcom: f64,
}

impl NodeMetrics {
    pub fn from_coupling(afferent: usize, efferent: usize) -> Self {
        Self {
            afferent,
            efferent,
            instability: instability(afferent, efferent),
            abstractness: None,
            distance: None,
            cyclomatic_complexity: 0,
            lcom: 0.0,
        }
    }

    /// Sets abstractness and derives the main-sequence distance from it.
    pub fn with_abstractness(mut self, abstractness: Option<f64>) -> Self {
        self.abstractness = abstractness;
        self.distance = abstractness.map(|a| distance(a, self.instability));
        self
    }
}

pub fn instability(afferent: usize, efferent: usize) -> f64 {
    let total = afferent + efferent;
    if total == 0 {
        0.0
    } else {
        efferent as f64 / total as f64
    }
}

pub fn distance(abstractness: f64, instability: f64) -> f64 {
    (abstractness + instability - 1.0).abs() / std::f64::consts::SQRT_2
}

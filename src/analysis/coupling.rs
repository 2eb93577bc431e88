use crate::analysis::DependencyGraph;

/// Martin coupling counts of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coupling {
    pub afferent: usize,
    pub efferent: usize,
}

impl Coupling {
    pub fn instability(&self) -> f64 {
        crate::model::instability(self.afferent, self.efferent)
    }
}

/// Ca and Ce of `id`: distinct other nodes on incoming and outgoing edges of
/// any kind. Parallel edges of several kinds count once; self-loops never count.
pub fn coupling(graph: &DependencyGraph, id: &str) -> Coupling {
    Coupling {
        afferent: graph.fan_in(id),
        efferent: graph.fan_out(id),
    }
}

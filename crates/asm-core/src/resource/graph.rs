// ── Resource dependency graph ──
//
// Nodes are resource references (declared or external, e.g. a start
// sequence handed in by the caller). An edge always points from the
// prerequisite to the dependent; its kind only decides on which side
// it is rendered (`require` on the dependent, `before` on the
// prerequisite).

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::reference::ResourceRef;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Rendered as `require => prerequisite` on the dependent.
    Require,
    /// Rendered as `before => dependent` on the prerequisite.
    Before,
}

#[derive(Debug, Default, Clone)]
pub struct ResourceGraph {
    graph: DiGraph<ResourceRef, EdgeKind>,
    index: HashMap<ResourceRef, NodeIndex>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, reference: &ResourceRef) -> NodeIndex {
        if let Some(idx) = self.index.get(reference) {
            return *idx;
        }
        let idx = self.graph.add_node(reference.clone());
        self.index.insert(reference.clone(), idx);
        idx
    }

    /// Record that `prerequisite` must be applied before `dependent`.
    ///
    /// Duplicate edges of the same kind are ignored.
    pub fn add_edge(&mut self, prerequisite: &ResourceRef, dependent: &ResourceRef, kind: EdgeKind) {
        let from = self.node(prerequisite);
        let to = self.node(dependent);
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == kind);
        if !exists {
            self.graph.add_edge(from, to, kind);
        }
    }

    /// Prerequisites rendered as `require` on `dependent`, in insertion order.
    pub fn requires_of(&self, dependent: &ResourceRef) -> Vec<ResourceRef> {
        self.neighbors(dependent, Direction::Incoming, EdgeKind::Require)
    }

    /// Dependents rendered as `before` on `prerequisite`, in insertion order.
    pub fn befores_of(&self, prerequisite: &ResourceRef) -> Vec<ResourceRef> {
        self.neighbors(prerequisite, Direction::Outgoing, EdgeKind::Before)
    }

    fn neighbors(&self, reference: &ResourceRef, dir: Direction, kind: EdgeKind) -> Vec<ResourceRef> {
        let Some(idx) = self.index.get(reference) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(*idx, dir)
            .filter(|edge| *edge.weight() == kind)
            .map(|edge| {
                let other = match dir {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (edge.id().index(), other)
            })
            .collect();
        edges.sort_unstable_by_key(|(order, _)| *order);
        edges
            .into_iter()
            .map(|(_, other)| self.graph[other].clone())
            .collect()
    }

    /// All edges as `(prerequisite, dependent)` pairs, in insertion order.
    pub fn edges(&self) -> Vec<(ResourceRef, ResourceRef)> {
        self.graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].clone(),
                    self.graph[edge.target()].clone(),
                )
            })
            .collect()
    }

    /// A valid application order, or the resource at which a cycle was found.
    pub fn topological_order(&self) -> Result<Vec<ResourceRef>, CoreError> {
        petgraph::algo::toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .map_err(|cycle| CoreError::DependencyCycle {
                resource: self.graph[cycle.node_id()].to_string(),
            })
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn r(id: &str) -> ResourceRef {
        ResourceRef::new("force10_interface", id)
    }

    #[test]
    fn requires_are_returned_in_insertion_order() {
        let mut g = ResourceGraph::new();
        g.add_edge(&r("b"), &r("a"), EdgeKind::Require);
        g.add_edge(&r("c"), &r("a"), EdgeKind::Require);
        assert_eq!(g.requires_of(&r("a")), vec![r("b"), r("c")]);
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let mut g = ResourceGraph::new();
        g.add_edge(&r("b"), &r("a"), EdgeKind::Require);
        g.add_edge(&r("b"), &r("a"), EdgeKind::Require);
        assert_eq!(g.edges().len(), 1);
    }

    #[test]
    fn before_edges_render_on_the_prerequisite() {
        let mut g = ResourceGraph::new();
        g.add_edge(&r("vlan"), &r("port"), EdgeKind::Before);
        assert_eq!(g.befores_of(&r("vlan")), vec![r("port")]);
        assert!(g.requires_of(&r("port")).is_empty());
    }

    #[test]
    fn cycles_are_reported() {
        let mut g = ResourceGraph::new();
        g.add_edge(&r("a"), &r("b"), EdgeKind::Require);
        g.add_edge(&r("b"), &r("a"), EdgeKind::Before);
        let err = g.topological_order().unwrap_err();
        assert!(matches!(err, CoreError::DependencyCycle { .. }));
    }
}

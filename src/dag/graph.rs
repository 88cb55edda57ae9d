// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use crate::errors::GraphError;

#[derive(Debug, Clone, Default)]
struct GraphNode {
    /// Direct dependencies: nodes this one points to.
    deps: Vec<String>,
    /// Direct dependents: nodes that point to this one.
    dependents: Vec<String>,
}

/// Directed graph over string identifiers, with edges running
/// `(dependent -> dependency)`.
///
/// Node and edge insertion are idempotent. Acyclicity is not enforced on
/// insertion; [`DirectedGraph::reachable_from`] detects cycles the moment a
/// node reappears on the current depth-first path.
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    // BTreeMap keeps traversal order deterministic.
    nodes: BTreeMap<String, GraphNode>,
}

/// Three-color DFS marker. Unvisited nodes are absent from the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: impl Into<String>) {
        self.nodes.entry(id.into()).or_default();
    }

    /// Add an edge from `from` (the dependent) to `to` (the dependency).
    ///
    /// Both endpoints must already exist. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(to) && self.nodes.contains_key(from) {
            return Err(GraphError::UnknownNode(to.to_string()));
        }
        let Some(node) = self.nodes.get_mut(from) else {
            return Err(GraphError::UnknownNode(from.to_string()));
        };
        if node.deps.iter().any(|d| d == to) {
            return Ok(());
        }
        node.deps.push(to.to_string());

        if let Some(dep) = self.nodes.get_mut(to) {
            dep.dependents.push(from.to_string());
        }

        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Direct dependencies of a node (edges out of it).
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.nodes.get(id).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Direct dependents of a node (edges into it).
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// All nodes reachable from `id` via dependency edges, dependencies
    /// first: for every edge `a -> b`, `b` appears before `a`.
    ///
    /// Fails with [`GraphError::CycleDetected`] as soon as a node already on
    /// the current path is revisited, naming the node and the path that led
    /// back to it.
    pub fn reachable_from(&self, id: &str) -> Result<Vec<String>, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path: Vec<String> = Vec::new();
        let mut order: Vec<String> = Vec::new();
        self.visit(id, &mut marks, &mut path, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::OnPath) => {
                return Err(GraphError::CycleDetected {
                    node: id.to_string(),
                    path: path.clone(),
                });
            }
            None => {}
        }

        marks.insert(id, Mark::OnPath);
        path.push(id.to_string());

        for dep in self.dependencies_of(id) {
            self.visit(dep, marks, path, order)?;
        }

        path.pop();
        marks.insert(id, Mark::Done);
        order.push(id.to_string());

        Ok(())
    }
}

//! Plant topology: technologies as nodes, interconnections as directed edges.
//!
//! The evaluation order of a plant is a topological order of this graph,
//! computed once when the plant is built.

use crate::error::{H2iError, H2iResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A variable forwarded from one technology to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub dest: String,
    pub source_var: String,
    pub dest_var: String,
}

impl Connection {
    /// Same variable name on both ends.
    pub fn same_name(source: impl Into<String>, dest: impl Into<String>, variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self {
            source: source.into(),
            dest: dest.into(),
            source_var: variable.clone(),
            dest_var: variable,
        }
    }
}

/// Directed graph of technologies.
#[derive(Debug, Clone, Default)]
pub struct PlantGraph {
    graph: DiGraph<String, Connection>,
    nodes: HashMap<String, NodeIndex>,
}

impl PlantGraph {
    pub fn new<I, S>(technologies: I) -> H2iResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut plant = Self::default();
        for tech in technologies {
            let tech = tech.into();
            if plant.nodes.contains_key(&tech) {
                return Err(H2iError::config(format!("technology '{tech}' listed twice")));
            }
            let idx = plant.graph.add_node(tech.clone());
            plant.nodes.insert(tech, idx);
        }
        Ok(plant)
    }

    fn node(&self, tech: &str) -> H2iResult<NodeIndex> {
        self.nodes.get(tech).copied().ok_or_else(|| {
            H2iError::config(format!("interconnection references unknown technology '{tech}'"))
        })
    }

    pub fn connect(&mut self, connection: Connection) -> H2iResult<()> {
        let source = self.node(&connection.source)?;
        let dest = self.node(&connection.dest)?;
        if source == dest {
            return Err(H2iError::config(format!(
                "technology '{}' cannot feed itself",
                connection.source
            )));
        }
        self.graph.add_edge(source, dest, connection);
        Ok(())
    }

    /// Technologies ordered so every source precedes its destinations.
    pub fn evaluation_order(&self) -> H2iResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .map_err(|cycle| {
                H2iError::config(format!(
                    "technology interconnections form a cycle through '{}'",
                    self.graph[cycle.node_id()]
                ))
            })
    }

    /// Connections that feed `tech`.
    pub fn incoming(&self, tech: &str) -> H2iResult<Vec<&Connection>> {
        let idx = self.node(tech)?;
        Ok(self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| edge.weight())
            .collect())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Graphviz DOT rendering of the plant.
    pub fn render_dot(&self) -> String {
        let mut buffer = String::new();
        buffer.push_str("digraph h2i_plant {\n");
        for node in self.graph.node_indices() {
            let label = sanitize_label(&self.graph[node]);
            buffer.push_str(&format!("  n{} [label=\"{}\"];\n", node.index(), label));
        }
        for edge in self.graph.edge_references() {
            let source = edge.source().index();
            let target = edge.target().index();
            let conn = edge.weight();
            let label = if conn.source_var == conn.dest_var {
                sanitize_label(&conn.source_var)
            } else {
                sanitize_label(&format!("{} -> {}", conn.source_var, conn.dest_var))
            };
            buffer.push_str(&format!("  n{source} -> n{target} [label=\"{label}\"];\n"));
        }
        buffer.push('}');
        buffer
    }
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

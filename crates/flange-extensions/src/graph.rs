//! Extension dependency graph export
//!
//! Edges point from a dependency to the extension that needs it, so reading
//! an edge `a -> b` as "a registers before b" matches the load order.

use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::registry::ExtensionRegistry;

/// Output formats for [`DependencyGraph::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Dot,
    Puml,
    Mermaid,
}

/// Directed graph of extension dependencies
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build from (alias, dependencies) pairs. Unknown dependencies get their own node.
    pub fn from_edges<'a, I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut graph = Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
        };
        let nodes: Vec<_> = nodes.into_iter().collect();
        for (alias, _) in &nodes {
            graph.node(alias);
        }
        for (alias, deps) in &nodes {
            let to = graph.node(alias);
            for dep in deps.iter() {
                let from = graph.node(dep);
                graph.graph.add_edge(from, to, ());
            }
        }
        graph
    }

    /// Graph of every extension in the registry, nodes in dependency order
    pub fn from_registry(registry: &ExtensionRegistry) -> Self {
        let order = registry.order();
        Self::from_edges(
            order
                .iter()
                .map(|alias| (*alias, registry.dependencies(alias).unwrap_or(&[]))),
        )
    }

    fn node(&mut self, alias: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(alias) {
            return idx;
        }
        let idx = self.graph.add_node(alias.to_string());
        self.node_indices.insert(alias.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// (dependency, dependent) pairs
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].as_str(), self.graph[b].as_str()))
            .collect()
    }

    /// Topological order, or `None` when the graph has a cycle
    pub fn topological_order(&self) -> Option<Vec<&str>> {
        toposort(&self.graph, None)
            .ok()
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n].as_str()).collect())
    }

    pub fn render(&self, format: GraphFormat) -> String {
        match format {
            GraphFormat::Dot => self.to_dot(),
            GraphFormat::Puml => self.to_puml(),
            GraphFormat::Mermaid => self.to_mermaid(),
        }
    }

    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(|_, alias| alias.as_str(), |_, _| "");
        format!("{}", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
    }

    pub fn to_puml(&self) -> String {
        let mut out = String::from("@startuml\n");
        for idx in self.graph.node_indices() {
            let alias = &self.graph[idx];
            out.push_str(&format!("component \"{}\" as {}\n", alias, identifier(alias)));
        }
        for (from, to) in self.edges() {
            out.push_str(&format!("{} --> {}\n", identifier(from), identifier(to)));
        }
        out.push_str("@enduml\n");
        out
    }

    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph LR\n");
        for idx in self.graph.node_indices() {
            let alias = &self.graph[idx];
            out.push_str(&format!("    {}[\"{}\"]\n", identifier(alias), alias));
        }
        for (from, to) in self.edges() {
            out.push_str(&format!("    {} --> {}\n", identifier(from), identifier(to)));
        }
        out
    }
}

/// Node id safe for PlantUML and Mermaid
fn identifier(alias: &str) -> String {
    alias
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

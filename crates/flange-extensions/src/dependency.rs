//! Dependency resolution using topological sort with DFS

use std::collections::HashMap;

use crate::error::{ExtensionError, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Dependency resolver using DFS-based topological sort.
///
/// Ties are broken by insertion order: an extension is emitted as soon as
/// everything it depends on has been emitted, scanning in the order nodes
/// were given.
pub struct DependencyResolver {
    nodes: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl DependencyResolver {
    /// Create a resolver from (alias, dependencies) pairs in insertion order
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let nodes: Vec<_> = nodes.into_iter().collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self { nodes, index }
    }

    /// Order every node so that dependencies come first
    pub fn resolve_all(&self) -> Result<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut stack = Vec::new();
        let mut resolved = Vec::with_capacity(self.nodes.len());

        for i in 0..self.nodes.len() {
            self.visit(i, &mut marks, &mut stack, &mut resolved)?;
        }
        Ok(resolved
            .into_iter()
            .map(|i| self.nodes[i].0.clone())
            .collect())
    }

    /// Visit a node using DFS, keeping the current path for cycle reporting
    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        resolved: &mut Vec<usize>,
    ) -> Result<()> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                // Cycle detection
                let start = stack.iter().position(|&n| n == node).unwrap_or(0);
                let cycle: Vec<&str> = stack[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .map(|&n| self.nodes[n].0.as_str())
                    .collect();
                return Err(ExtensionError::cyclic_dependency(&cycle));
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::Visiting;
        stack.push(node);

        let (name, deps) = &self.nodes[node];
        for dep in deps {
            let Some(&next) = self.index.get(dep) else {
                return Err(ExtensionError::UnknownDependency {
                    alias: name.clone(),
                    dependency: dep.clone(),
                });
            };
            self.visit(next, marks, stack, resolved)?;
        }

        stack.pop();
        marks[node] = Mark::Done;
        resolved.push(node);
        Ok(())
    }
}

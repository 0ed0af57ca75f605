//! Dependency graph construction and traversal.

use std::collections::{HashMap, HashSet};
use std::fmt;

use hitch_core::dependency::Scope;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// A node in the resolved dependency graph: one concrete coordinate at the
/// version the resolver selected for it.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub scope: Scope,
}

impl ResolvedNode {
    /// `group:artifact` identifier (without version).
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({})",
            self.group, self.artifact, self.version, self.scope
        )
    }
}

/// Edge label in the dependency graph.
#[derive(Debug, Clone)]
pub struct DepEdge {
    pub scope: Scope,
    pub optional: bool,
}

/// A resolved dependency graph backed by petgraph.
///
/// There is no single project root here: every coordinate the caller passed
/// to `resolve` becomes its own top-level node, since the engine resolves a
/// caller-supplied coordinate list rather than one project's manifest.
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, DepEdge>,
    /// Lookup from `group:artifact` to node index (only the resolved version).
    index: HashMap<String, NodeIndex>,
    top_level: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            top_level: Vec::new(),
        }
    }

    /// Add or retrieve a node. If the key already exists, returns the existing index.
    pub fn add_node(&mut self, node: ResolvedNode) -> NodeIndex {
        let key = node.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Mark a node as one of the caller's requested top-level coordinates.
    pub fn add_top_level(&mut self, idx: NodeIndex) {
        if !self.top_level.contains(&idx) {
            self.top_level.push(idx);
        }
    }

    /// Add a dependency edge from `from` to `to`.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Look up a node by `group:artifact`.
    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Get the node data for an index.
    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// All resolved nodes, top-level coordinates included.
    pub fn all_nodes(&self) -> Vec<&ResolvedNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx]).collect()
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect()
    }

    /// Reverse dependencies (who depends on this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect()
    }

    /// Render the forest of top-level coordinates and their transitive
    /// dependencies as a tree.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let mut visited = HashSet::new();
        let count = self.top_level.len();

        for (i, &idx) in self.top_level.iter().enumerate() {
            let node = &self.graph[idx];
            output.push_str(&format!("{node}\n"));
            visited.insert(idx);

            let deps = self.dependencies_of(idx);
            let dep_count = deps.len();
            for (j, (child, _)) in deps.iter().enumerate() {
                let is_last = j == dep_count - 1;
                self.print_subtree(&mut output, *child, "", is_last, 1, max_depth, &mut visited);
            }
            if i != count - 1 {
                output.push('\n');
            }
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, _)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find the path from some top-level coordinate to a specific dependency.
    ///
    /// Accepts either `group:artifact` or just `artifact` (partial match).
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&ResolvedNode>> {
        let target = self.resolve_key(target_key)?;
        for &root in &self.top_level {
            let mut path = Vec::new();
            let mut visited = HashSet::new();
            if self.dfs_path(root, target, &mut path, &mut visited) {
                return Some(path.iter().map(|&idx| &self.graph[idx]).collect());
            }
        }
        None
    }

    /// Resolve a user-provided key to a node index.
    ///
    /// Tries exact `group:artifact` first, then falls back to matching by artifact name.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(key) {
            return Some(idx);
        }
        for (full_key, &idx) in &self.index {
            let artifact = full_key.split(':').nth(1).unwrap_or("");
            if artifact == key {
                return Some(idx);
            }
        }
        None
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for edge in self.graph.edges(current) {
            if self.dfs_path(edge.target(), target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Build an inverted dependency tree (reverse edges) for a single artifact.
    ///
    /// Accepts either `group:artifact` or just `artifact` (partial match).
    pub fn print_inverted_tree(&self, target_key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve_key(target_key) else {
            return output;
        };

        let node = &self.graph[idx];
        output.push_str(&format!("{node}\n"));

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(&mut output, *dep_idx, "", is_last, &mut visited);
        }

        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(output, *dep_idx, &child_prefix, is_last, visited);
        }

        visited.remove(&idx);
    }

    /// Print a full inverted tree showing every node and what depends on it.
    pub fn print_full_inverted_tree(&self) -> String {
        let mut output = String::new();

        let mut nodes: Vec<(NodeIndex, &ResolvedNode)> = self
            .graph
            .node_indices()
            .map(|idx| (idx, &self.graph[idx]))
            .collect();
        nodes.sort_by(|a, b| a.1.key().cmp(&b.1.key()));

        for (idx, node) in &nodes {
            let dependents = self.dependents_of(*idx);
            if dependents.is_empty() {
                continue;
            }
            output.push_str(&format!("{node}\n"));
            let count = dependents.len();
            for (i, (dep_idx, _)) in dependents.iter().enumerate() {
                let is_last = i == count - 1;
                let connector = if is_last { "└── " } else { "├── " };
                let dep_node = &self.graph[*dep_idx];
                output.push_str(&format!("{connector}{dep_node}\n"));
            }
            output.push('\n');
        }

        output
    }

    /// Number of resolved nodes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(group: &str, artifact: &str, version: &str, scope: Scope) -> ResolvedNode {
        ResolvedNode {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            scope,
        }
    }

    fn edge(scope: Scope) -> DepEdge {
        DepEdge {
            scope,
            optional: false,
        }
    }

    #[test]
    fn add_and_find() {
        let mut g = DependencyGraph::new();
        let node = make_node("org.example", "lib", "1.0", Scope::Compile);
        let idx = g.add_node(node.clone());
        assert_eq!(g.find("org.example:lib"), Some(idx));
        assert_eq!(g.node(idx).version, "1.0");
    }

    #[test]
    fn duplicate_add_returns_same_index() {
        let mut g = DependencyGraph::new();
        let idx1 = g.add_node(make_node("org.example", "lib", "1.0", Scope::Compile));
        let idx2 = g.add_node(make_node("org.example", "lib", "1.0", Scope::Compile));
        assert_eq!(idx1, idx2);
    }

    #[test]
    fn tree_printing_with_multiple_top_level_coordinates() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "a", "1.0", Scope::Compile));
        let b = g.add_node(make_node("org.b", "b", "2.0", Scope::Compile));
        let c = g.add_node(make_node("org.c", "c", "3.0", Scope::Compile));
        g.add_top_level(a);
        g.add_top_level(b);
        g.add_edge(a, c, edge(Scope::Compile));

        let tree = g.print_tree(None);
        assert!(tree.contains("org.a:a:1.0"));
        assert!(tree.contains("org.b:b:2.0"));
        assert!(tree.contains("org.c:c:3.0"));
    }

    #[test]
    fn find_path_exists() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "a", "1.0", Scope::Compile));
        let b = g.add_node(make_node("org.b", "b", "1.0", Scope::Compile));
        g.add_top_level(a);
        g.add_edge(a, b, edge(Scope::Compile));

        let path = g.find_path("org.b:b").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].artifact, "a");
        assert_eq!(path[1].artifact, "b");
    }

    #[test]
    fn find_path_not_found() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "a", "1.0", Scope::Compile));
        g.add_top_level(a);
        assert!(g.find_path("org.missing:lib").is_none());
    }

    #[test]
    fn inverted_tree() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "a", "1.0", Scope::Compile));
        let b = g.add_node(make_node("org.b", "b", "1.0", Scope::Compile));
        g.add_top_level(a);
        g.add_edge(a, b, edge(Scope::Compile));

        let inv = g.print_inverted_tree("org.b:b");
        assert!(inv.contains("org.b:b:1.0"));
        assert!(inv.contains("org.a:a:1.0"));
    }

    #[test]
    fn inverted_tree_partial_key() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "a", "1.0", Scope::Compile));
        g.add_top_level(a);

        let inv = g.print_inverted_tree("a");
        assert!(inv.contains("org.a:a:1.0"));
    }

    #[test]
    fn find_path_partial_key() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "app", "1.0", Scope::Compile));
        let b = g.add_node(make_node("org.a", "my-lib", "1.0", Scope::Compile));
        g.add_top_level(a);
        g.add_edge(a, b, edge(Scope::Compile));

        let path = g.find_path("my-lib").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].artifact, "my-lib");
    }

    #[test]
    fn add_top_level_is_idempotent() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(make_node("org.a", "a", "1.0", Scope::Compile));
        g.add_top_level(a);
        g.add_top_level(a);
        let tree = g.print_tree(None);
        assert_eq!(tree.matches("org.a:a:1.0").count(), 1);
    }
}

//! Generic DAG levelling.
//!
//! Given a list of nodes and a `dependencies(node) -> Vec<node>` function,
//! [`level`] partitions the nodes into a list of levels such that for every
//! edge `u -> v` (v depends on u), `level(u) < level(v)`. Cycles are
//! detected via the active recursion path and reported with every node
//! identifier on the cycle, in visit order. A dependency that is not part
//! of the input set is a hard error naming both endpoints.
//!
//! Within a level, nodes keep the order they had in the input slice, so the
//! function is deterministic for a given input.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Errors produced while levelling a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError<N: fmt::Display> {
    /// The active recursion path re-entered a node already on the path.
    #[error("circular dependency: {}", join_cycle(.0))]
    Cycle(Vec<N>),
    /// `dependencies(node)` named something outside the input set.
    #[error("workspace '{node}' depends on unknown workspace '{dependency}'")]
    MissingDependency {
        /// The node whose dependency list named the missing node.
        node: N,
        /// The dependency that was not found among the input nodes.
        dependency: N,
    },
}

fn join_cycle<N: fmt::Display>(path: &[N]) -> String {
    path.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

/// Level the given nodes according to `dependencies`.
///
/// Level `0` contains every node with no dependencies; level `k` contains
/// every node whose dependencies are all in levels `0..k`.
///
/// # Errors
///
/// Returns [`GraphError::Cycle`] if the dependency relation is not a DAG,
/// or [`GraphError::MissingDependency`] if `dependencies` names a node that
/// is not present in `nodes`.
pub fn level<N, F>(nodes: &[N], dependencies: F) -> Result<Vec<Vec<N>>, GraphError<N>>
where
    N: Clone + Eq + Hash + fmt::Display,
    F: Fn(&N) -> Vec<N>,
{
    let known: HashMap<&N, ()> = nodes.iter().map(|n| (n, ())).collect();
    let mut heights: HashMap<N, usize> = HashMap::new();
    let mut path: Vec<N> = Vec::new();

    for node in nodes {
        height_of(node, &known, &dependencies, &mut heights, &mut path)?;
    }

    let max_height = heights.values().copied().max().unwrap_or(0);
    let mut levels: Vec<Vec<N>> = (0..max_height).map(|_| Vec::new()).collect();
    for node in nodes {
        // unwrap is safe: every node was visited by the loop above.
        #[allow(clippy::expect_used)]
        let h = *heights.get(node).expect("height computed for every input node");
        levels[h - 1].push(node.clone());
    }

    Ok(levels)
}

fn height_of<N, F>(
    node: &N,
    known: &HashMap<&N, ()>,
    dependencies: &F,
    heights: &mut HashMap<N, usize>,
    path: &mut Vec<N>,
) -> Result<usize, GraphError<N>>
where
    N: Clone + Eq + Hash + fmt::Display,
    F: Fn(&N) -> Vec<N>,
{
    if let Some(h) = heights.get(node) {
        return Ok(*h);
    }

    if let Some(pos) = path.iter().position(|n| n == node) {
        let mut cycle: Vec<N> = path[pos..].to_vec();
        cycle.push(node.clone());
        return Err(GraphError::Cycle(cycle));
    }

    path.push(node.clone());

    let mut max_dep_height = 0usize;
    for dep in dependencies(node) {
        if !known.contains_key(&dep) {
            path.pop();
            return Err(GraphError::MissingDependency {
                node: node.clone(),
                dependency: dep,
            });
        }
        let dep_height = height_of(&dep, known, dependencies, heights, path)?;
        max_dep_height = max_dep_height.max(dep_height);
    }

    path.pop();
    let height = 1 + max_dep_height;
    heights.insert(node.clone(), height);
    Ok(height)
}

/// A small arena-backed DAG for callers that want index-based node
/// identities instead of hashing a domain type directly.
///
/// Mirrors the shape of a task-dependency graph: nodes are pushed in,
/// edges recorded as `dependent -> dependency` pairs, and [`Dag::levels`]
/// delegates to [`level`] over plain `usize` indices.
#[derive(Debug, Clone, Default)]
pub struct Dag<T> {
    nodes: Vec<T>,
    /// `deps[i]` lists the indices that node `i` depends on.
    deps: Vec<Vec<usize>>,
}

impl<T> Dag<T> {
    /// Create an empty DAG.
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new(), deps: Vec::new() }
    }

    /// Add a node, returning its index.
    pub fn add_node(&mut self, value: T) -> usize {
        self.nodes.push(value);
        self.deps.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Record that `dependent` depends on `dependency`.
    pub fn add_dependency(&mut self, dependent: usize, dependency: usize) {
        self.deps[dependent].push(dependency);
    }

    /// Borrow the node at `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> &T {
        &self.nodes[index]
    }

    /// Number of nodes in the DAG.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DAG has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Level the DAG, returning indices grouped by level.
    ///
    /// # Errors
    ///
    /// See [`level`].
    pub fn levels(&self) -> Result<Vec<Vec<usize>>, GraphError<usize>> {
        let indices: Vec<usize> = (0..self.nodes.len()).collect();
        level(&indices, |i| self.deps[*i].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn deps_of<'a>(graph: &'a Map<&'static str, Vec<&'static str>>) -> impl Fn(&&'static str) -> Vec<&'static str> + 'a {
        move |n: &&'static str| graph.get(n).cloned().unwrap_or_default()
    }

    #[test]
    fn linear_chain_levels_in_order() {
        let mut graph = Map::new();
        graph.insert("a", vec![]);
        graph.insert("b", vec!["a"]);
        graph.insert("c", vec!["b"]);
        let nodes = ["a", "b", "c"];

        let levels = level(&nodes, deps_of(&graph)).expect("no cycle");
        assert_eq!(levels, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn diamond_groups_independent_nodes_in_input_order() {
        let mut graph = Map::new();
        graph.insert("a", vec![]);
        graph.insert("b", vec!["a"]);
        graph.insert("c", vec!["a"]);
        graph.insert("d", vec!["b", "c"]);
        let nodes = ["d", "c", "b", "a"];

        let levels = level(&nodes, deps_of(&graph)).expect("no cycle");
        assert_eq!(levels, vec![vec!["a"], vec!["c", "b"], vec!["d"]]);
    }

    #[test]
    fn cycle_is_reported_with_identifiers() {
        let mut graph = Map::new();
        graph.insert("a", vec!["b"]);
        graph.insert("b", vec!["a"]);
        let nodes = ["a", "b"];

        let err = level(&nodes, deps_of(&graph)).unwrap_err();
        match err {
            GraphError::Cycle(path) => {
                assert!(path.contains(&"a"));
                assert!(path.contains(&"b"));
            }
            GraphError::MissingDependency { .. } => panic!("expected cycle error"),
        }
    }

    #[test]
    fn missing_dependency_names_both_endpoints() {
        let mut graph = Map::new();
        graph.insert("a", vec!["ghost"]);
        let nodes = ["a"];

        let err = level(&nodes, deps_of(&graph)).unwrap_err();
        match err {
            GraphError::MissingDependency { node, dependency } => {
                assert_eq!(node, "a");
                assert_eq!(dependency, "ghost");
            }
            GraphError::Cycle(_) => panic!("expected missing-dependency error"),
        }
    }

    #[test]
    fn dag_wrapper_levels_by_index() {
        let mut dag = Dag::new();
        let a = dag.add_node("a");
        let b = dag.add_node("b");
        let c = dag.add_node("c");
        dag.add_dependency(b, a);
        dag.add_dependency(c, b);

        let levels = dag.levels().expect("no cycle");
        assert_eq!(levels, vec![vec![a], vec![b], vec![c]]);
    }
}

//! Directed Graph
//!
//! An adjacency-list graph over opaque node identifiers, with the
//! depth-first search used to order a digest.
//!
//! # Algorithm
//!
//! `depth_first_search` is the classic DFS-based topological sort
//! (Cormen et al., "Introduction to Algorithms", 3rd ed., §22.3):
//!
//! 1. Start a visit from each source node, left to right
//! 2. On entering a node, mark it visited and visit its adjacent nodes in
//!    insertion order
//! 3. Once every adjacent node is finished, append the node to the output
//!
//! The output is the finish order. Reversing it yields a topological order
//! of everything reachable from the sources, provided that subgraph is
//! acyclic. Cycles are not detected: an already-visited node is never
//! re-entered, so the search always terminates, but the order may then place
//! a node ahead of one of its dependencies.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use smallvec::SmallVec;

/// Most nodes fan out to a handful of dependents.
type Adjacency<N> = SmallVec<[N; 4]>;

/// A directed graph stored as adjacency lists keyed by source node.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N>
where
    N: Copy + Eq + Hash,
{
    /// Outgoing edges, in insertion order.
    edges: HashMap<N, Adjacency<N>>,
}

impl<N> DirectedGraph<N>
where
    N: Copy + Eq + Hash,
{
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Add an edge from `u` to `v`: `v` depends on `u`.
    ///
    /// Adding the same edge twice records it twice. Duplicates do not change
    /// the result of a traversal.
    pub fn add_edge(&mut self, u: N, v: N) {
        self.edges.entry(u).or_default().push(v);
    }

    /// The nodes `u` points to, in the order the edges were added.
    pub fn adjacent(&self, u: N) -> &[N] {
        self.edges.get(&u).map(|adj| adj.as_slice()).unwrap_or(&[])
    }

    /// Number of distinct nodes that have at least one outgoing edge.
    pub fn source_count(&self) -> usize {
        self.edges.len()
    }

    /// Total number of edges, duplicates included.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|adj| adj.len()).sum()
    }

    /// Depth-first search from every source, visiting every reachable node.
    pub fn depth_first_search_all<I>(&self, sources: I) -> Vec<N>
    where
        I: IntoIterator<Item = N>,
    {
        self.depth_first_search(sources, |_| true)
    }

    /// Depth-first search returning nodes in finish order.
    ///
    /// A node is entered only if it has not been visited yet during this
    /// call and `should_visit` accepts it. Adjacent nodes are finished
    /// before the node itself is appended.
    pub fn depth_first_search<I, F>(&self, sources: I, mut should_visit: F) -> Vec<N>
    where
        I: IntoIterator<Item = N>,
        F: FnMut(N) -> bool,
    {
        let mut visited = HashSet::new();
        let mut finished = Vec::new();

        // (node, index of the next adjacent node to try)
        let mut stack: Vec<(N, usize)> = Vec::new();

        for source in sources {
            if visited.contains(&source) || !should_visit(source) {
                continue;
            }
            visited.insert(source);
            stack.push((source, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                let adjacent = self.adjacent(node);

                if next < adjacent.len() {
                    frame.1 += 1;
                    let child = adjacent[next];
                    if !visited.contains(&child) && should_visit(child) {
                        visited.insert(child);
                        stack.push((child, 0));
                    }
                } else {
                    stack.pop();
                    finished.push(node);
                }
            }
        }

        finished
    }
}

impl<N> Default for DirectedGraph<N>
where
    N: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_is_empty_for_unknown_node() {
        let graph: DirectedGraph<u32> = DirectedGraph::new();
        assert!(graph.adjacent(7).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn adjacent_keeps_insertion_order() {
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 3);
        graph.add_edge(1, 2);
        graph.add_edge(1, 5);

        assert_eq!(graph.adjacent(1), &[3, 2, 5]);
        // Stable across calls
        assert_eq!(graph.adjacent(1), graph.adjacent(1));
    }

    #[test]
    fn duplicate_edges_are_recorded() {
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(1, 2);

        assert_eq!(graph.adjacent(1), &[2, 2]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.source_count(), 1);

        // Still visited once
        assert_eq!(graph.depth_first_search_all([1]), vec![2, 1]);
    }

    #[test]
    fn finish_order_of_a_chain() {
        // 1 -> 2 -> 3
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);

        assert_eq!(graph.depth_first_search_all([1]), vec![3, 2, 1]);
    }

    #[test]
    fn finish_order_matches_recursive_visit() {
        //     1
        //    / \
        //   2   3
        //    \ /
        //     4
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(1, 3);
        graph.add_edge(2, 4);
        graph.add_edge(3, 4);

        assert_eq!(graph.depth_first_search_all([1]), vec![4, 2, 3, 1]);
    }

    #[test]
    fn sources_are_processed_left_to_right() {
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 10);
        graph.add_edge(2, 10);
        graph.add_edge(10, 20);

        // 10 and 20 are finished while visiting 1; 2 only adds itself
        assert_eq!(graph.depth_first_search_all([1, 2]), vec![20, 10, 1, 2]);
        assert_eq!(graph.depth_first_search_all([2, 1]), vec![20, 10, 2, 1]);
    }

    #[test]
    fn should_visit_prunes_nodes() {
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);
        graph.add_edge(1, 4);

        let order = graph.depth_first_search([1], |n| n != 2);
        assert_eq!(order, vec![4, 1]);

        let order = graph.depth_first_search([1], |n| n != 1);
        assert!(order.is_empty());
    }

    #[test]
    fn cycles_terminate() {
        // 1 -> 2 -> 3 -> 1
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);
        graph.add_edge(3, 1);

        let order = graph.depth_first_search_all([1]);
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn unconnected_source_is_returned_alone() {
        let graph: DirectedGraph<u32> = DirectedGraph::new();
        assert_eq!(graph.depth_first_search_all([9]), vec![9]);
    }
}

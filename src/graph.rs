//! Compressed neighbor graph for the lattice.
//!
//! Neighbors are stored CSR-style: `offset[i]` is the exclusive upper bound of
//! node `i`'s edges inside `neighbor`, and the lower bound is `offset[i - 1]`
//! (0 for the first node). `central` runs parallel to `neighbor` and names the
//! node that owns each flattened edge, so a per-edge kernel can read both
//! endpoints of edge `k` without searching the offset table.
//!
//! The builder trusts the mesh collaborator for symmetry: if node `a` lists
//! `b`, nothing checks that `b` lists `a`. Duplicates pass through as well.

use std::ops::Range;

use crate::error::TopologyError;

/// Per-node neighbor lists in compressed form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborGraph {
    central: Vec<i32>,
    neighbor: Vec<i32>,
    offset: Vec<i32>,
}

impl NeighborGraph {
    /// Build the graph from a flattened neighbor list and its offset table.
    ///
    /// `offset` must have exactly `node_count` entries, never decrease, and
    /// end at `neighbor.len()`. Every neighbor index must be a valid node.
    pub fn build(
        node_count: usize,
        neighbor: Vec<i32>,
        offset: Vec<i32>,
    ) -> Result<Self, TopologyError> {
        if offset.len() != node_count {
            return Err(TopologyError::OffsetLength {
                expected: node_count,
                found: offset.len(),
            });
        }

        let mut central = Vec::with_capacity(neighbor.len());
        let mut lower = 0usize;
        for (node, &upper) in offset.iter().enumerate() {
            if upper < 0 || (upper as usize) < lower {
                return Err(TopologyError::NonMonotonicOffset { node });
            }
            let upper = upper as usize;
            if upper > neighbor.len() {
                return Err(TopologyError::EdgeCount {
                    offset_end: upper,
                    neighbors: neighbor.len(),
                });
            }
            central.extend(std::iter::repeat(node as i32).take(upper - lower));
            lower = upper;
        }

        if lower != neighbor.len() {
            return Err(TopologyError::EdgeCount {
                offset_end: lower,
                neighbors: neighbor.len(),
            });
        }

        if let Some((edge, &n)) = neighbor
            .iter()
            .enumerate()
            .find(|(_, &n)| n < 0 || n as usize >= node_count)
        {
            return Err(TopologyError::DanglingNeighbor {
                edge,
                neighbor: n,
                node_count,
            });
        }

        Ok(Self {
            central,
            neighbor,
            offset,
        })
    }

    /// Build the graph from one adjacency list per node.
    pub fn from_adjacency<L: AsRef<[u32]>>(lists: &[L]) -> Result<Self, TopologyError> {
        let mut neighbor = Vec::new();
        let mut offset = Vec::with_capacity(lists.len());
        for list in lists {
            neighbor.extend(list.as_ref().iter().map(|&n| n as i32));
            offset.push(neighbor.len() as i32);
        }
        Self::build(lists.len(), neighbor, offset)
    }

    /// Number of nodes (length of the offset table).
    pub fn node_count(&self) -> usize {
        self.offset.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.neighbor.len()
    }

    /// Range of flattened edge indices owned by `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node >= node_count()`.
    pub fn range(&self, node: usize) -> Range<usize> {
        let lower = if node == 0 {
            0
        } else {
            self.offset[node - 1] as usize
        };
        lower..self.offset[node] as usize
    }

    /// Neighbor indices of `node`.
    pub fn neighbors_of(&self, node: usize) -> &[i32] {
        &self.neighbor[self.range(node)]
    }

    /// Iterate `(central, neighbor)` pairs in flattened edge order.
    pub fn edges(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.central.iter().copied().zip(self.neighbor.iter().copied())
    }

    pub fn central(&self) -> &[i32] {
        &self.central
    }

    pub fn neighbor(&self) -> &[i32] {
        &self.neighbor
    }

    pub fn offset(&self) -> &[i32] {
        &self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_node_keeps_offsets_flat() {
        let graph = NeighborGraph::from_adjacency(&[vec![1u32], vec![], vec![0, 1]]).unwrap();
        assert_eq!(graph.offset(), &[1, 1, 3]);
        assert_eq!(graph.central(), &[0, 2, 2]);
        assert!(graph.neighbors_of(1).is_empty());
        assert_eq!(graph.range(1), 1..1);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let graph = NeighborGraph::from_adjacency(&[vec![1u32, 1], vec![0]]).unwrap();
        assert_eq!(graph.neighbor(), &[1, 1, 0]);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_offset_length_mismatch() {
        let err = NeighborGraph::build(3, vec![1, 0], vec![1, 2]).unwrap_err();
        assert_eq!(err, TopologyError::OffsetLength { expected: 3, found: 2 });
    }

    #[test]
    fn test_decreasing_offset_rejected() {
        let err = NeighborGraph::build(3, vec![1, 2, 0], vec![2, 1, 3]).unwrap_err();
        assert_eq!(err, TopologyError::NonMonotonicOffset { node: 1 });
    }

    #[test]
    fn test_short_offset_end_rejected() {
        let err = NeighborGraph::build(2, vec![1, 0, 1], vec![1, 2]).unwrap_err();
        assert_eq!(err, TopologyError::EdgeCount { offset_end: 2, neighbors: 3 });
    }

    #[test]
    fn test_dangling_neighbor_rejected() {
        let err = NeighborGraph::build(2, vec![1, 5], vec![1, 2]).unwrap_err();
        assert_eq!(
            err,
            TopologyError::DanglingNeighbor { edge: 1, neighbor: 5, node_count: 2 }
        );
    }

    #[test]
    fn test_edges_pair_up() {
        let graph = NeighborGraph::from_adjacency(&[vec![1u32, 2], vec![0], vec![1]]).unwrap();
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![(0, 1), (0, 2), (1, 0), (2, 1)]);
    }
}

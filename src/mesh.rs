//! Mesh collaborator interface and a procedural periodic lattice.
//!
//! The simulator never reads mesh files itself. It asks a [`MeshSource`] for
//! tagged groups, one query per region, and gets back node indices,
//! coordinates and element-derived adjacency in compressed form.

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::topology::Extent;

/// Element kind requested from the mesh collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Single-node point elements.
    Point,
    /// Two-node line segments.
    Line,
    /// Three-node triangles.
    Triangle,
    /// Four-node quadrangles.
    Quad,
}

impl ElementKind {
    /// Nodes per element.
    pub fn vertices(&self) -> usize {
        match self {
            ElementKind::Point => 1,
            ElementKind::Line => 2,
            ElementKind::Triangle => 3,
            ElementKind::Quad => 4,
        }
    }
}

/// Result of one tagged group query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGroup {
    /// Mesh node indices belonging to the group, in iteration order.
    pub node_indices: Vec<i32>,
    /// Coordinates of those nodes, padded to 4 components.
    pub node_coordinates: Vec<[f32; 4]>,
    /// Flattened neighbor indices.
    pub neighbors: Vec<i32>,
    /// Exclusive upper bound into `neighbors` for each node.
    pub neighbor_offsets: Vec<i32>,
    /// Number of element node entries matched (elements × vertices).
    pub element_count: usize,
    /// Number of physical group entries matched.
    pub group_count: usize,
}

/// Mesh group tags for each region role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupTags {
    pub surface: i32,
    pub border: i32,
    pub side_x: i32,
    pub side_y: i32,
}

impl Default for GroupTags {
    fn default() -> Self {
        Self {
            surface: 1,
            border: 9,
            side_x: 10,
            side_y: 11,
        }
    }
}

/// Anything that can answer tagged group queries.
pub trait MeshSource {
    /// Extract the group with `tag` at `dimension` made of `kind` elements.
    fn process_group(
        &mut self,
        tag: i32,
        dimension: u32,
        kind: ElementKind,
    ) -> Result<MeshGroup, TopologyError>;
}

/// A quad lattice over an axis-aligned [`Extent`] with periodic sides.
///
/// Nodes are laid out row-major, `resolution` per side, including both
/// boundary rows. The last column is the periodic image of the first, so a
/// neighbor step off one side lands one node in from the opposite side.
#[derive(Clone, Debug)]
pub struct PeriodicSquare {
    resolution: usize,
    extent: Extent,
    tags: GroupTags,
}

impl PeriodicSquare {
    /// Create a lattice with `resolution` nodes per side.
    ///
    /// Resolutions below 3 produce a lattice with no periodic interior and
    /// are rejected when queried, as are empty or inverted extents.
    pub fn new(resolution: usize, extent: Extent, tags: GroupTags) -> Self {
        Self {
            resolution,
            extent,
            tags,
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    fn index(&self, i: usize, j: usize) -> i32 {
        (j * self.resolution + i) as i32
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    fn coordinate(&self, i: usize, j: usize) -> [f32; 4] {
        let e = &self.extent;
        let steps = (self.resolution - 1) as f32;
        [
            e.x_min + i as f32 * (e.x_max - e.x_min) / steps,
            e.y_min + j as f32 * (e.y_max - e.y_min) / steps,
            0.0,
            1.0,
        ]
    }

    /// Wrap a step along one axis, skipping the periodic image.
    fn wrap(&self, k: usize, forward: bool) -> usize {
        let n = self.resolution;
        match (forward, k) {
            (true, k) if k + 1 == n => 1,
            (true, k) => k + 1,
            (false, 0) => n - 2,
            (false, k) => k - 1,
        }
    }

    fn group(&self, nodes: Vec<(usize, usize)>, element_count: usize) -> MeshGroup {
        MeshGroup {
            node_indices: nodes.iter().map(|&(i, j)| self.index(i, j)).collect(),
            node_coordinates: nodes.iter().map(|&(i, j)| self.coordinate(i, j)).collect(),
            neighbors: Vec::new(),
            neighbor_offsets: Vec::new(),
            group_count: nodes.len(),
            element_count,
        }
    }

    fn surface(&self) -> MeshGroup {
        let n = self.resolution;
        let nodes: Vec<_> = (0..n).flat_map(|j| (0..n).map(move |i| (i, j))).collect();
        let quads = (n - 1) * (n - 1);
        let mut group = self.group(nodes, quads * ElementKind::Quad.vertices());

        for j in 0..n {
            for i in 0..n {
                group.neighbors.extend([
                    self.index(self.wrap(i, false), j),
                    self.index(self.wrap(i, true), j),
                    self.index(i, self.wrap(j, false)),
                    self.index(i, self.wrap(j, true)),
                ]);
                group.neighbor_offsets.push(group.neighbors.len() as i32);
            }
        }
        group.group_count = quads * ElementKind::Quad.vertices();
        group
    }

    fn border(&self) -> MeshGroup {
        let n = self.resolution;
        let nodes: Vec<_> = (0..n)
            .flat_map(|j| (0..n).map(move |i| (i, j)))
            .filter(|&(i, j)| i == 0 || j == 0 || i == n - 1 || j == n - 1)
            .collect();
        let count = nodes.len();
        self.group(nodes, count)
    }
}

impl MeshSource for PeriodicSquare {
    fn process_group(
        &mut self,
        tag: i32,
        dimension: u32,
        kind: ElementKind,
    ) -> Result<MeshGroup, TopologyError> {
        if self.resolution < 3 {
            return Err(TopologyError::Mesh(format!(
                "periodic square needs at least 3 nodes per side, got {}",
                self.resolution
            )));
        }
        let e = &self.extent;
        if !(e.x_max > e.x_min && e.y_max > e.y_min) {
            return Err(TopologyError::Mesh(format!(
                "periodic square needs a non-empty extent, got x [{}, {}], y [{}, {}]",
                e.x_min, e.x_max, e.y_min, e.y_max
            )));
        }
        let n = self.resolution;

        let group = if tag == self.tags.surface && dimension == 2 && kind == ElementKind::Quad {
            self.surface()
        } else if tag == self.tags.border && kind == ElementKind::Point {
            self.border()
        } else if tag == self.tags.side_x && kind == ElementKind::Point {
            self.group((0..n).map(|i| (i, 0)).collect(), n)
        } else if tag == self.tags.side_y && kind == ElementKind::Point {
            self.group((0..n).map(|j| (0, j)).collect(), n)
        } else {
            MeshGroup::default()
        };
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(n: usize) -> PeriodicSquare {
        PeriodicSquare::new(n, Extent::default(), GroupTags::default())
    }

    #[test]
    fn test_surface_has_four_neighbors_per_node() {
        let mut mesh = lattice(5);
        let surface = mesh.process_group(1, 2, ElementKind::Quad).unwrap();
        assert_eq!(surface.node_indices.len(), 25);
        assert_eq!(surface.neighbors.len(), 100);
        assert_eq!(surface.neighbor_offsets.last(), Some(&100));
    }

    #[test]
    fn test_periodic_wrap_skips_image() {
        let mut mesh = lattice(4);
        let surface = mesh.process_group(1, 2, ElementKind::Quad).unwrap();
        // Node (0, 0): left wraps to column 2, down wraps to row 2.
        assert_eq!(&surface.neighbors[0..4], &[2, 1, 8, 4]);
        // Node (3, 0) is the image of (0, 0): right wraps to column 1.
        assert_eq!(&surface.neighbors[12..16], &[2, 1, 11, 7]);
    }

    #[test]
    fn test_side_groups_span_full_edge() {
        let mut mesh = lattice(6);
        let side_x = mesh.process_group(10, 1, ElementKind::Point).unwrap();
        let side_y = mesh.process_group(11, 1, ElementKind::Point).unwrap();
        assert_eq!(side_x.node_indices.len(), 6);
        assert_eq!(side_y.node_indices, vec![0, 6, 12, 18, 24, 30]);
    }

    #[test]
    fn test_border_is_ring_of_nodes() {
        let mut mesh = lattice(4);
        let border = mesh.process_group(9, 1, ElementKind::Point).unwrap();
        assert_eq!(border.node_indices.len(), 12);
    }

    #[test]
    fn test_unknown_tag_is_empty() {
        let mut mesh = lattice(4);
        let group = mesh.process_group(42, 2, ElementKind::Quad).unwrap();
        assert!(group.node_indices.is_empty());
        assert_eq!(group.element_count, 0);
    }

    #[test]
    fn test_coordinates_follow_extent() {
        let extent = Extent {
            x_min: 0.0,
            x_max: 4.0,
            y_min: -1.0,
            y_max: 1.0,
        };
        let mut mesh = PeriodicSquare::new(5, extent, GroupTags::default());
        let surface = mesh.process_group(1, 2, ElementKind::Quad).unwrap();
        assert_eq!(surface.node_coordinates[0], [0.0, -1.0, 0.0, 1.0]);
        assert_eq!(surface.node_coordinates[1], [1.0, -1.0, 0.0, 1.0]);
        assert_eq!(surface.node_coordinates[5], [0.0, -0.5, 0.0, 1.0]);
        assert_eq!(surface.node_coordinates[24], [4.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_inverted_extent_rejected() {
        let extent = Extent {
            x_min: 1.0,
            x_max: -1.0,
            ..Extent::default()
        };
        let mut mesh = PeriodicSquare::new(5, extent, GroupTags::default());
        assert!(matches!(
            mesh.process_group(1, 2, ElementKind::Quad),
            Err(TopologyError::Mesh(_))
        ));
    }

    #[test]
    fn test_too_small_rejected() {
        let mut mesh = lattice(2);
        assert!(mesh.process_group(1, 2, ElementKind::Quad).is_err());
    }
}

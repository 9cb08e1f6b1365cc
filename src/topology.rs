//! Lattice extraction from a tagged mesh.
//!
//! Groups are queried in a fixed order: side-x, side-y, surface, border.
//! The two side groups only contribute their node counts, which give the
//! lattice spacing along each axis.

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::graph::NeighborGraph;
use crate::mesh::{ElementKind, GroupTags, MeshSource};

const SURFACE_DIM: u32 = 2;
const BORDER_DIM: u32 = 1;
const SIDE_DIM: u32 = 1;

/// Axis-aligned bounds of the simulated domain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            x_min: -1.0,
            x_max: 1.0,
            y_min: -1.0,
            y_max: 1.0,
        }
    }
}

/// Node spacing along each lattice axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacing {
    pub dx: f32,
    pub dy: f32,
}

/// Everything the state store needs from the mesh.
#[derive(Clone, Debug)]
pub struct Lattice {
    pub positions: Vec<[f32; 4]>,
    pub graph: NeighborGraph,
    /// Border node indices. Currently informational only.
    pub border: Vec<i32>,
    pub spacing: Spacing,
    pub element_count: usize,
    pub group_count: usize,
}

impl Lattice {
    pub fn node_count(&self) -> usize {
        self.positions.len()
    }
}

fn side_spacing(nodes: usize, lo: f32, hi: f32, role: &'static str) -> Result<f32, TopologyError> {
    if nodes < 2 {
        return Err(TopologyError::DegenerateSide { role, nodes });
    }
    Ok((hi - lo) / (nodes - 1) as f32)
}

/// Query `mesh` for every tagged region and assemble the lattice.
pub fn extract<M: MeshSource + ?Sized>(
    mesh: &mut M,
    tags: &GroupTags,
    extent: &Extent,
) -> Result<Lattice, TopologyError> {
    let side_x = mesh.process_group(tags.side_x, SIDE_DIM, ElementKind::Point)?;
    let side_y = mesh.process_group(tags.side_y, SIDE_DIM, ElementKind::Point)?;
    let spacing = Spacing {
        dx: side_spacing(side_x.node_indices.len(), extent.x_min, extent.x_max, "side-x")?,
        dy: side_spacing(side_y.node_indices.len(), extent.y_min, extent.y_max, "side-y")?,
    };

    let surface = mesh.process_group(tags.surface, SURFACE_DIM, ElementKind::Quad)?;
    if surface.element_count == 0 || surface.node_indices.is_empty() {
        return Err(TopologyError::EmptyGroup {
            tag: tags.surface,
            role: "surface",
        });
    }

    let node_count = surface.node_indices.len();
    let graph = NeighborGraph::build(node_count, surface.neighbors, surface.neighbor_offsets)?;

    log::info!("nodes = {}", node_count);
    log::info!("elements = {}", surface.element_count / ElementKind::Quad.vertices());
    log::info!("groups = {}", surface.group_count / ElementKind::Quad.vertices());
    log::info!("neighbours = {}", graph.edge_count());
    if log::log_enabled!(log::Level::Debug) {
        for (i, &index) in surface.node_indices.iter().enumerate() {
            log::debug!(
                "i = {}, node index = {}, neighbour indices: {:?}",
                i,
                index,
                graph.neighbors_of(i)
            );
        }
    }

    let border = mesh.process_group(tags.border, BORDER_DIM, ElementKind::Point)?;
    if border.node_indices.is_empty() {
        return Err(TopologyError::EmptyGroup {
            tag: tags.border,
            role: "border",
        });
    }

    Ok(Lattice {
        positions: surface.node_coordinates,
        graph,
        border: border.node_indices,
        spacing,
        element_count: surface.element_count,
        group_count: surface.group_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PeriodicSquare;

    #[test]
    fn test_extract_periodic_square() {
        let tags = GroupTags::default();
        let mut mesh = PeriodicSquare::new(5, Extent::default(), tags);
        let lattice = extract(&mut mesh, &tags, &Extent::default()).unwrap();

        assert_eq!(lattice.node_count(), 25);
        assert_eq!(lattice.graph.node_count(), 25);
        assert_eq!(lattice.graph.edge_count(), 100);
        assert_eq!(lattice.border.len(), 16);
        assert!((lattice.spacing.dx - 0.5).abs() < 1e-6);
        assert!((lattice.spacing.dy - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let mut mesh = PeriodicSquare::new(5, Extent::default(), GroupTags::default());
        let tags = GroupTags {
            surface: 99,
            ..GroupTags::default()
        };
        let err = extract(&mut mesh, &tags, &Extent::default()).unwrap_err();
        assert_eq!(err, TopologyError::EmptyGroup { tag: 99, role: "surface" });
    }

    #[test]
    fn test_spacing_matches_node_coordinates() {
        let tags = GroupTags::default();
        let extent = Extent {
            x_min: -2.0,
            x_max: 2.0,
            y_min: 0.0,
            y_max: 1.0,
        };
        let mut mesh = PeriodicSquare::new(5, extent, tags);
        let lattice = extract(&mut mesh, &tags, &extent).unwrap();

        assert!((lattice.spacing.dx - 1.0).abs() < 1e-6);
        assert!((lattice.spacing.dy - 0.25).abs() < 1e-6);
        let p = &lattice.positions;
        assert!((p[1][0] - p[0][0] - lattice.spacing.dx).abs() < 1e-6);
        assert!((p[5][1] - p[0][1] - lattice.spacing.dy).abs() < 1e-6);
        assert_eq!(p[0][..2], [-2.0, 0.0]);
        assert_eq!(p[24][..2], [2.0, 1.0]);
    }

    #[test]
    fn test_missing_border_fails() {
        let mut mesh = PeriodicSquare::new(5, Extent::default(), GroupTags::default());
        let tags = GroupTags {
            border: 88,
            ..GroupTags::default()
        };
        let err = extract(&mut mesh, &tags, &Extent::default()).unwrap_err();
        assert_eq!(err, TopologyError::EmptyGroup { tag: 88, role: "border" });
    }

    #[test]
    fn test_missing_side_fails() {
        let mut mesh = PeriodicSquare::new(5, Extent::default(), GroupTags::default());
        let tags = GroupTags {
            side_x: 77,
            ..GroupTags::default()
        };
        let err = extract(&mut mesh, &tags, &Extent::default()).unwrap_err();
        assert_eq!(err, TopologyError::DegenerateSide { role: "side-x", nodes: 0 });
    }
}

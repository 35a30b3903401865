//! Addressing of the dense reconstruction lattice.

use itertools::iproduct;
use na::Point3;

/// A dense lattice of `resolution³` nodes, with `resolution = 2^depth`.
///
/// Lattice coordinates map to linear indices as `x·res² + y·res + z`. Every field
/// of the reconstruction (splatted normals, divergence, solution) is stored with
/// this convention.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DenseGrid {
    depth: u32,
    resolution: usize,
}

impl DenseGrid {
    /// Initialize a grid with `2^depth` nodes along each axis.
    ///
    /// The depth must be at least 1 so every node has a cell to belong to.
    pub fn new(depth: u32) -> Self {
        assert!(depth >= 1, "The grid depth must be at least 1.");
        Self {
            depth,
            resolution: 1 << depth,
        }
    }

    /// The depth this grid was built with.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of nodes along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.resolution * self.resolution * self.resolution
    }

    /// Linear index of the node at `coord`.
    pub fn index(&self, coord: &Point3<usize>) -> usize {
        debug_assert!(coord.iter().all(|e| *e < self.resolution));
        (coord.x * self.resolution + coord.y) * self.resolution + coord.z
    }

    /// Lattice coordinates of the node with the given linear index.
    pub fn coord(&self, index: usize) -> Point3<usize> {
        let res2 = self.resolution * self.resolution;
        Point3::new(
            index / res2,
            (index % res2) / self.resolution,
            index % self.resolution,
        )
    }

    /// Is the (possibly negative) coordinate a node of this grid?
    pub fn contains(&self, coord: &Point3<i64>) -> bool {
        coord
            .iter()
            .all(|e| *e >= 0 && (*e as usize) < self.resolution)
    }

    /// Linear index of `coord` if it is a node of this grid.
    pub fn signed_index(&self, coord: &Point3<i64>) -> Option<usize> {
        if self.contains(coord) {
            Some(self.index(&coord.map(|e| e as usize)))
        } else {
            None
        }
    }

    /// Linear index of the neighbor of `coord` shifted by `step` along `axis`, if it exists.
    pub fn neighbor(&self, coord: &Point3<usize>, axis: usize, step: i64) -> Option<usize> {
        let mut shifted = coord.map(|e| e as i64);
        shifted[axis] += step;
        self.signed_index(&shifted)
    }

    /// Linear indices of the (up to six) axis-aligned neighbors of `coord`.
    pub fn axis_neighbors<'a>(
        &'a self,
        coord: &'a Point3<usize>,
    ) -> impl Iterator<Item = usize> + 'a {
        iproduct!(0..3, [-1, 1]).filter_map(move |(axis, step)| self.neighbor(coord, axis, step))
    }

    /// All the nodes of this grid, in increasing linear index order.
    pub fn nodes(&self) -> impl Iterator<Item = Point3<usize>> {
        let res = self.resolution;
        iproduct!(0..res, 0..res, 0..res).map(|(x, y, z)| Point3::new(x, y, z))
    }

    /// The lower corner of every cube of `2×2×2` nodes.
    pub fn cells(&self) -> impl Iterator<Item = Point3<usize>> {
        let res = self.resolution - 1;
        iproduct!(0..res, 0..res, 0..res).map(|(x, y, z)| Point3::new(x, y, z))
    }
}

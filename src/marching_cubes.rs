//! Marching-cubes polygonisation of a scalar field sampled on a [`DenseGrid`].

use crate::grid::DenseGrid;
use crate::marching_cubes_tables::{EDGE_TABLE, TRI_TABLE};
use crate::node_registry::NodeRegistry;
use crate::splat::CORNERS;
use crate::Real;
use na::Point3;

/// The two cube corners joined by each of the twelve cube edges.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// The triangles extracted by [`marching_cubes`], in lattice coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSurface {
    /// One vertex per lattice edge crossed by the isosurface.
    pub vertices: Vec<Point3<Real>>,
    /// Triangles, as indices into `vertices`.
    ///
    /// Their normals (right-hand rule) point towards increasing field values.
    pub triangles: Vec<[u32; 3]>,
}

/// The configuration index of a cube: bit `i` is set if `values[i] < level`.
pub fn cube_configuration(values: &[Real; 8], level: Real) -> usize {
    values
        .iter()
        .enumerate()
        .filter(|(_, val)| **val < level)
        .fold(0, |config, (i, _)| config | (1 << i))
}

/// Extracts the isosurface of `values` at `level`.
///
/// `values` holds one sample per grid node, indexed like the grid. Vertices are
/// interpolated linearly along the crossed lattice edges and shared between the cubes
/// adjacent to each edge.
pub fn marching_cubes(grid: &DenseGrid, values: &[Real], level: Real) -> RawSurface {
    assert_eq!(values.len(), grid.num_nodes());
    let mut edge_vertices = NodeRegistry::new();
    let mut surface = RawSurface::default();

    for cell in grid.cells() {
        let mut corner_values = [0.0; 8];

        for (shift, val) in CORNERS.iter().zip(corner_values.iter_mut()) {
            *val = values[grid.index(&(cell + shift))];
        }

        let config = cube_configuration(&corner_values, level);
        let crossed_edges = EDGE_TABLE[config];

        if crossed_edges == 0 {
            continue;
        }

        let mut cube_vertices = [0u32; 12];

        for (edge, [a, b]) in EDGE_CORNERS.iter().enumerate() {
            if crossed_edges & (1 << edge) == 0 {
                continue;
            }

            let pa = cell + CORNERS[*a];
            let pb = cell + CORNERS[*b];
            // Edges are keyed by their midpoint on the doubled lattice.
            let key = Point3::from((pa.coords + pb.coords).map(|e| e as u32));
            let (vid, inserted) = edge_vertices.insert_or_get(&key);

            if inserted {
                let (va, vb) = (corner_values[*a], corner_values[*b]);
                let t = (level - va) / (vb - va);
                let pa = pa.cast::<Real>();
                let pb = pb.cast::<Real>();
                surface.vertices.push(pa + (pb - pa) * t);
            }

            cube_vertices[edge] = vid as u32;
        }

        for tri in TRI_TABLE[config]
            .chunks_exact(3)
            .take_while(|tri| tri[0] >= 0)
        {
            surface.triangles.push([
                cube_vertices[tri[0] as usize],
                cube_vertices[tri[1] as usize],
                cube_vertices[tri[2] as usize],
            ]);
        }
    }

    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use na::Vector3;

    #[test]
    fn tables_are_consistent() {
        assert_eq!(EDGE_TABLE[0], 0);
        assert_eq!(EDGE_TABLE[255], 0);

        for config in 0..256 {
            let mut used = 0u16;

            for tri in TRI_TABLE[config]
                .chunks_exact(3)
                .take_while(|tri| tri[0] >= 0)
            {
                for edge in tri {
                    used |= 1 << *edge;
                }
            }

            assert_eq!(used, EDGE_TABLE[config], "configuration {}", config);

            // An edge is crossed iff its corners are on different sides.
            for (edge, [a, b]) in EDGE_CORNERS.iter().enumerate() {
                let crossed = ((config >> *a) & 1) != ((config >> *b) & 1);
                assert_eq!(crossed, EDGE_TABLE[config] & (1 << edge) != 0);
            }
        }
    }

    #[test]
    fn configuration_bits() {
        let mut values = [1.0; 8];
        values[0] = -1.0;
        values[6] = -1.0;
        assert_eq!(cube_configuration(&values, 0.0), 0b0100_0001);
        assert_eq!(cube_configuration(&[0.5; 8], 0.5), 0);
    }

    fn ball_field(grid: &DenseGrid, center: Point3<Real>, radius: Real) -> Vec<Real> {
        grid.nodes()
            .map(|node| radius - (node.cast::<Real>() - center).norm())
            .collect()
    }

    #[test]
    fn ball_is_closed_and_faces_inwards() {
        let grid = DenseGrid::new(3);
        let center = Point3::new(3.5, 3.4, 3.6);
        let values = ball_field(&grid, center, 2.7);
        let surface = marching_cubes(&grid, &values, 0.0);
        let mesh = Mesh::new(surface.vertices, surface.triangles);

        assert!(!mesh.is_empty());
        assert!(mesh.is_closed());

        for i in 0..mesh.num_triangles() {
            let to_center: Vector3<Real> = center - mesh.triangle_centroid(i);
            assert!(mesh.triangle_normal(i).dot(&to_center) > 0.0);
        }
    }

    #[test]
    fn vertices_lie_on_crossed_edges() {
        let grid = DenseGrid::new(2);
        let values: Vec<_> = grid.nodes().map(|node| node.x as Real).collect();
        let surface = marching_cubes(&grid, &values, 1.25);

        // The plane x = 1.25 crosses the 4×4 edges going from x = 1 to x = 2.
        assert_eq!(surface.vertices.len(), 16);
        assert_eq!(surface.triangles.len(), 18);
        assert!(surface.vertices.iter().all(|v| (v.x - 1.25).abs() < 1.0e-12));
    }

    #[test]
    fn no_crossing_no_triangle() {
        let grid = DenseGrid::new(2);
        let values = vec![3.0; grid.num_nodes()];
        assert_eq!(marching_cubes(&grid, &values, 3.0), RawSurface::default());
        assert_eq!(marching_cubes(&grid, &values, 1.0), RawSurface::default());
    }
}

use crate::error::ReconstructionError;
use crate::grid::DenseGrid;
use crate::marching_cubes::marching_cubes;
use crate::mesh::Mesh;
use crate::Real;
use na::DVector;

/// How the iso-level of the extracted surface is chosen.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum IsoLevel {
    /// The arithmetic mean of all the field values.
    ///
    /// This compensates the bias of the solved field, whose theoretical level of zero
    /// is not preserved by the screened, boundary-truncated discretization.
    #[default]
    Mean,
    /// A fixed level.
    Fixed(Real),
}

impl IsoLevel {
    /// The actual level for the given field.
    pub fn resolve(&self, values: &DVector<Real>) -> Real {
        match self {
            Self::Mean => values.mean(),
            Self::Fixed(level) => *level,
        }
    }
}

/// Extracts the isosurface of a solved field as a mesh in unit-cube coordinates.
///
/// Vertices are divided by `resolution − 1`, and every triangle returned by marching
/// cubes is reversed so the normals face towards decreasing field values (outwards, for
/// an indicator field that is larger inside the shape).
pub fn extract_isosurface(
    grid: &DenseGrid,
    solution: &DVector<Real>,
    iso_level: IsoLevel,
) -> Result<Mesh, ReconstructionError> {
    assert_eq!(solution.len(), grid.num_nodes());
    let level = iso_level.resolve(solution);
    log::debug!(
        "iso-level {:.6}, field range [{:.4}, {:.4}]",
        level,
        solution.min(),
        solution.max()
    );

    let surface = marching_cubes(grid, solution.as_slice(), level);

    if surface.triangles.is_empty() {
        return Err(ReconstructionError::EmptyIsosurface { level });
    }

    let lattice_scale = (grid.resolution() - 1) as Real;
    let vertices = surface
        .vertices
        .into_iter()
        .map(|v| v / lattice_scale)
        .collect();
    let triangles = surface
        .triangles
        .into_iter()
        .map(|[a, b, c]| [c, b, a])
        .collect();

    Ok(Mesh::new(vertices, triangles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::Point3;

    fn ball_field(grid: &DenseGrid) -> DVector<Real> {
        let center = Point3::new(3.4, 3.6, 3.5);
        DVector::from_iterator(
            grid.num_nodes(),
            grid.nodes()
                .map(|node| (3.0 - (node.cast::<Real>() - center).norm()).max(0.0)),
        )
    }

    #[test]
    fn constant_field_has_no_isosurface() {
        let grid = DenseGrid::new(3);
        let field = DVector::from_element(grid.num_nodes(), 0.25);

        assert_eq!(
            extract_isosurface(&grid, &field, IsoLevel::Mean),
            Err(ReconstructionError::EmptyIsosurface { level: 0.25 })
        );
    }

    #[test]
    fn mean_level() {
        let field = DVector::from_vec(vec![0.0, 1.0, 2.0, 5.0]);
        assert_eq!(IsoLevel::Mean.resolve(&field), 2.0);
        assert_eq!(IsoLevel::Fixed(0.5).resolve(&field), 0.5);
    }

    #[test]
    fn reverses_marching_cubes_winding() {
        let grid = DenseGrid::new(3);
        let field = ball_field(&grid);
        let raw = marching_cubes(&grid, field.as_slice(), field.mean());
        let mesh = extract_isosurface(&grid, &field, IsoLevel::Mean).unwrap();

        assert_eq!(mesh.num_triangles(), raw.triangles.len());
        for (tri, raw_tri) in mesh.triangles.iter().zip(raw.triangles.iter()) {
            assert_eq!(*tri, [raw_tri[2], raw_tri[1], raw_tri[0]]);
        }

        for (v, raw_v) in mesh.vertices.iter().zip(raw.vertices.iter()) {
            assert_eq!(*v, *raw_v / 7.0);
        }
    }

    #[test]
    fn unit_cube_vertices_and_outward_normals() {
        let grid = DenseGrid::new(3);
        let field = ball_field(&grid);
        let mesh = extract_isosurface(&grid, &field, IsoLevel::Fixed(1.0)).unwrap();
        let center = Point3::new(3.4, 3.6, 3.5) / 7.0;

        assert!(mesh.is_closed());
        assert!(mesh
            .vertices
            .iter()
            .all(|v| v.iter().all(|e| (0.0..=1.0).contains(e))));

        for i in 0..mesh.num_triangles() {
            let outward = mesh.triangle_centroid(i) - center;
            assert!(mesh.triangle_normal(i).dot(&outward) > 0.0);
        }
    }
}

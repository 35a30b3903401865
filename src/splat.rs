use crate::grid::DenseGrid;
use crate::Real;
use na::{vector, Point3, Vector3};

/// Offsets of the eight corners of a grid cell.
///
/// This order is shared by the trilinear weights and the marching-cubes tables.
pub(crate) const CORNERS: [Vector3<usize>; 8] = [
    vector![0, 0, 0],
    vector![1, 0, 0],
    vector![1, 1, 0],
    vector![0, 1, 0],
    vector![0, 0, 1],
    vector![1, 0, 1],
    vector![1, 1, 1],
    vector![0, 1, 1],
];

/// Trilinear interpolation weights of the eight corners of a cell, given the position
/// `bcoords ∈ [0, 1]³` of a sample relative to the cell’s lower corner.
///
/// The weights are ordered like the cell corners `000, 100, 110, 010, 001, 101, 111, 011`
/// and sum to one.
pub fn trilinear_weights(bcoords: &Vector3<Real>) -> [Real; 8] {
    CORNERS.map(|corner| {
        corner
            .zip_map(bcoords, |v, b| if v == 0 { 1.0 - b } else { b })
            .product()
    })
}

/// Lower corner of the cell used to interpolate at the lattice-space point `scaled`,
/// together with the point’s position relative to that corner.
///
/// The corner is clamped so all eight nodes of the cell belong to the grid.
pub(crate) fn interpolation_cell(
    grid: &DenseGrid,
    scaled: &Vector3<Real>,
) -> (Point3<usize>, Vector3<Real>) {
    let max_base = (grid.resolution() - 2) as Real;
    let base = scaled.map(|e| e.floor().clamp(0.0, max_base));
    (Point3::from(base.map(|e| e as usize)), scaled - base)
}

/// Deposits the normals at the given unit-cube points into a dense vector field.
///
/// Each normal is distributed over the eight nodes of the cell containing its point,
/// with trilinear weights. Accumulation is additive, so the result does not depend on
/// the order of the samples (up to floating-point rounding).
pub fn splat_normals(
    grid: &DenseGrid,
    unit_points: &[Point3<Real>],
    normals: &[Vector3<Real>],
) -> Vec<Vector3<Real>> {
    assert_eq!(
        unit_points.len(),
        normals.len(),
        "Exactly one normal per point must be provided."
    );
    let lattice_scale = (grid.resolution() - 1) as Real;
    let mut field = vec![Vector3::zeros(); grid.num_nodes()];

    for (pt, n) in unit_points.iter().zip(normals.iter()) {
        let (base, bcoords) = interpolation_cell(grid, &(pt.coords * lattice_scale));
        let coeffs = trilinear_weights(&bcoords);

        for (corner_shift, coeff) in CORNERS.iter().zip(coeffs.iter()) {
            let node = (base + corner_shift).map(|e| e as i64);

            if let Some(id) = grid.signed_index(&node) {
                field[id] += *n * *coeff;
            }
        }
    }

    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn weights_sum_to_one() {
        for bcoords in [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.25, 0.5, 0.75),
            Vector3::new(0.999, 0.001, 0.3),
            Vector3::new(0.1, 0.9, 0.0),
        ] {
            let weights = trilinear_weights(&bcoords);
            assert_relative_eq!(weights.iter().sum::<Real>(), 1.0, epsilon = 1.0e-12);
            assert!(weights.iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn weights_match_corner_order() {
        let weights = trilinear_weights(&Vector3::new(0.25, 0.5, 1.0));
        // Corner 101: x weight 0.25, y weight 0.5, z weight 1.
        assert_relative_eq!(weights[5], 0.125);
        // Corner 000 lies on the opposite z face.
        assert_relative_eq!(weights[0], 0.0);
    }

    #[test]
    fn sample_on_a_node_deposits_everything_there() {
        let grid = DenseGrid::new(3);
        let pt = Point3::new(2.0, 3.0, 4.0) / 7.0;
        let n = Vector3::new(0.0, 0.6, 0.8);
        let field = splat_normals(&grid, &[pt], &[n]);
        let node = grid.index(&Point3::new(2, 3, 4));

        assert_relative_eq!(field[node], n, epsilon = 1.0e-12);
        let total: Vector3<Real> = field.iter().sum();
        assert_relative_eq!(total, n, epsilon = 1.0e-12);
    }

    #[test]
    fn cell_is_clamped_on_the_upper_faces() {
        let grid = DenseGrid::new(3);
        let (base, bcoords) = interpolation_cell(&grid, &Vector3::repeat(7.0));

        assert_eq!(base, Point3::new(6, 6, 6));
        assert_relative_eq!(bcoords, Vector3::repeat(1.0));

        let n = Vector3::new(1.0, 0.0, 0.0);
        let field = splat_normals(&grid, &[Point3::new(1.0, 1.0, 1.0)], &[n]);
        let last = grid.index(&Point3::new(7, 7, 7));

        assert_relative_eq!(field[last], n);
        let total: Vector3<Real> = field.iter().sum();
        assert_relative_eq!(total, n);
    }

    #[test]
    fn cell_at_the_origin() {
        let grid = DenseGrid::new(3);
        let (base, bcoords) = interpolation_cell(&grid, &Vector3::zeros());

        assert_eq!(base, Point3::origin());
        assert_eq!(bcoords, Vector3::zeros());

        let n = Vector3::new(0.0, -0.6, 0.8);
        let field = splat_normals(&grid, &[Point3::origin()], &[n]);

        assert_relative_eq!(field[0], n);
        let total: Vector3<Real> = field.iter().sum();
        assert_relative_eq!(total, n);
    }

    #[test]
    fn splatting_is_order_independent() {
        let grid = DenseGrid::new(3);
        let points: Vec<_> = (0..50)
            .map(|i| {
                let t = i as Real;
                Point3::new(
                    0.05 + 0.9 * (t * 0.37).fract(),
                    0.05 + 0.9 * (t * 0.61).fract(),
                    0.05 + 0.9 * (t * 0.83).fract(),
                )
            })
            .collect();
        let normals: Vec<_> = (0..50)
            .map(|i| {
                let t = i as Real;
                Vector3::new(t.cos(), t.sin(), 0.5).normalize()
            })
            .collect();

        let forward = splat_normals(&grid, &points, &normals);
        let rev_points: Vec<_> = points.iter().rev().copied().collect();
        let rev_normals: Vec<_> = normals.iter().rev().copied().collect();
        let backward = splat_normals(&grid, &rev_points, &rev_normals);

        for (a, b) in forward.iter().zip(backward.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1.0e-12);
        }
    }
}

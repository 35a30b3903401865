use crate::grid::DenseGrid;
use crate::Real;
use na::{DVector, Vector3};
use rayon::prelude::*;

/// Central-difference divergence of a dense vector field.
///
/// Along each axis, a node contributes `(V[+1] − V[−1]) / 2` only if both neighbors exist.
/// Nodes on a boundary face omit that axis’ term entirely: no reflection nor extrapolation
/// is applied.
pub fn divergence(grid: &DenseGrid, field: &[Vector3<Real>]) -> DVector<Real> {
    assert_eq!(field.len(), grid.num_nodes());
    let mut rhs = DVector::zeros(grid.num_nodes());

    rhs.as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(node_id, rhs)| {
            let coord = grid.coord(node_id);

            for axis in 0..3 {
                if let (Some(prev), Some(next)) = (
                    grid.neighbor(&coord, axis, -1),
                    grid.neighbor(&coord, axis, 1),
                ) {
                    *rhs += (field[next][axis] - field[prev][axis]) / 2.0;
                }
            }
        });

    rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_field_has_zero_divergence() {
        let grid = DenseGrid::new(3);
        let field = vec![Vector3::zeros(); grid.num_nodes()];
        let div = divergence(&grid, &field);
        assert!(div.iter().all(|e| *e == 0.0));
    }

    #[test]
    fn linear_field_with_truncated_boundary() {
        let grid = DenseGrid::new(2);
        let field: Vec<_> = grid
            .nodes()
            .map(|c| Vector3::new(c.x as Real, 2.0 * c.y as Real, 0.0))
            .collect();
        let div = divergence(&grid, &field);
        let last = grid.resolution() - 1;

        for node in grid.nodes() {
            let mut expected = 0.0;
            if node.x > 0 && node.x < last {
                expected += 1.0;
            }
            if node.y > 0 && node.y < last {
                expected += 2.0;
            }

            assert_relative_eq!(div[grid.index(&node)], expected);
        }
    }

    #[test]
    fn constant_field_has_zero_divergence() {
        let grid = DenseGrid::new(3);
        let field = vec![Vector3::new(0.3, -1.0, 2.0); grid.num_nodes()];
        let div = divergence(&grid, &field);
        assert!(div.iter().all(|e| *e == 0.0));
    }
}

use crate::grid::DenseGrid;
use crate::Real;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Assembles the screened 7-point Laplacian `A = L + alpha·I` of the grid.
///
/// Every row has the diagonal `6 + alpha`, whatever the number of in-bounds neighbors of
/// the node, and `-1` for each of its in-bounds axis-aligned neighbors. The matrix is
/// symmetric positive-definite for any `alpha > 0`.
pub fn assemble_screened_laplacian(grid: &DenseGrid, alpha: Real) -> CsrMatrix<Real> {
    let num_nodes = grid.num_nodes();
    let mut laplacian = CooMatrix::new(num_nodes, num_nodes);

    for (nid, node) in grid.nodes().enumerate() {
        laplacian.push(nid, nid, 6.0 + alpha);

        for other_nid in grid.axis_neighbors(&node) {
            laplacian.push(nid, other_nid, -1.0);
        }
    }

    CsrMatrix::from(&laplacian)
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::Point3;

    #[test]
    fn uniform_diagonal() {
        let alpha = 1.0e-5;
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, alpha);

        assert_eq!(a.nrows(), grid.num_nodes());
        assert_eq!(a.ncols(), grid.num_nodes());

        for (i, row) in a.row_iter().enumerate() {
            let diag = row.get_entry(i).unwrap().into_value();
            assert_eq!(diag, 6.0 + alpha);
        }
    }

    #[test]
    fn exactly_symmetric() {
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, 0.5);
        let at = a.transpose();

        assert_eq!(a.row_offsets(), at.row_offsets());
        assert_eq!(a.col_indices(), at.col_indices());
        assert_eq!(a.values(), at.values());
    }

    #[test]
    fn neighbor_counts() {
        let grid = DenseGrid::new(2);
        let a = assemble_screened_laplacian(&grid, 1.0e-5);
        let corner = grid.index(&Point3::new(0, 0, 0));
        let edge = grid.index(&Point3::new(1, 0, 0));
        let interior = grid.index(&Point3::new(1, 2, 1));

        assert_eq!(a.row(corner).nnz(), 4);
        assert_eq!(a.row(edge).nnz(), 5);
        assert_eq!(a.row(interior).nnz(), 7);
        assert!(a.row(interior).values().iter().filter(|v| **v == -1.0).count() == 6);
        assert!(a.nnz() <= 7 * grid.num_nodes());
    }
}

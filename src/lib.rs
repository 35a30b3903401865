/*!
Rust implementation of the [Screened poisson reconstruction](https://www.cs.jhu.edu/~misha/MyPapers/ToG13.pdf)
by Kazhdan and Hoppe, restricted to a single dense voxel grid.

Oriented normals are splatted into a vector field, its divergence drives a screened
discrete Laplacian system solved with conjugate gradients, and the resulting indicator
field is polygonised with marching cubes.
*/

#![allow(clippy::type_complexity, clippy::too_many_arguments)]
#![warn(missing_docs)]

/// Floating-point type used by this library.
pub type Real = f64;

extern crate nalgebra as na;
extern crate parry3d_f64 as parry;

pub use self::conjugate_gradient::{
    ConjugateGradient, ConvergenceWarning, Preconditioner, SolveReport,
};
pub use self::divergence::divergence;
pub use self::error::{ErrorKind, ReconstructionError};
pub use self::grid::DenseGrid;
pub use self::isosurface::{extract_isosurface, IsoLevel};
pub use self::laplacian::assemble_screened_laplacian;
pub use self::mesh::Mesh;
pub use self::normalizer::CoordinateNormalizer;
pub use self::poisson::{
    reconstruct, reconstruct_or_empty, PoissonReconstruction, ReconstructionParams, HARD_MAX_DEPTH,
};
pub use self::splat::{splat_normals, trilinear_weights};

mod conjugate_gradient;
mod divergence;
mod error;
pub mod grid;
mod isosurface;
mod laplacian;
pub mod marching_cubes;
mod marching_cubes_tables;
mod mesh;
pub mod node_registry;
mod normalizer;
mod poisson;
mod splat;

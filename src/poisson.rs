use crate::conjugate_gradient::{ConjugateGradient, Preconditioner, SolveReport};
use crate::divergence::divergence;
use crate::error::ReconstructionError;
use crate::grid::DenseGrid;
use crate::isosurface::{extract_isosurface, IsoLevel};
use crate::laplacian::assemble_screened_laplacian;
use crate::mesh::Mesh;
use crate::normalizer::CoordinateNormalizer;
use crate::splat::{interpolation_cell, splat_normals, trilinear_weights, CORNERS};
use crate::Real;
use na::{DVector, Point3, Vector3};

/// Largest depth accepted as a safety ceiling, whatever the configuration.
pub const HARD_MAX_DEPTH: u32 = 16;

/// Parameters of a dense-grid screened Poisson reconstruction.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ReconstructionParams {
    /// The grid has `2^depth` nodes along each axis.
    pub depth: u32,
    /// Padding factor (> 1) applied to the points’ bounding box before normalization.
    pub scale: Real,
    /// The screening coefficient (> 0) added to the Laplacian diagonal.
    pub alpha: Real,
    /// Relative residual tolerance of the conjugate-gradient solver.
    pub cg_tolerance: Real,
    /// Iteration cap of the conjugate-gradient solver.
    pub cg_max_iterations: usize,
    /// Preconditioner of the conjugate-gradient solver.
    pub preconditioner: Preconditioner,
    /// The level of the extracted isosurface.
    pub iso_level: IsoLevel,
    /// Requests deeper than this fail with [`ReconstructionError::ResolutionTooLarge`].
    pub max_depth: u32,
    /// Resolutions above this are accepted, but logged as potentially slow.
    pub warn_resolution: usize,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            depth: 6,
            scale: 1.1,
            alpha: 1.0e-5,
            cg_tolerance: 1.0e-6,
            cg_max_iterations: 1000,
            preconditioner: Preconditioner::None,
            iso_level: IsoLevel::Mean,
            max_depth: 8,
            warn_resolution: 128,
        }
    }
}

impl ReconstructionParams {
    /// Sets the grid depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the bounding box padding factor.
    pub fn with_scale(mut self, scale: Real) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the screening coefficient.
    pub fn with_alpha(mut self, alpha: Real) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the solver tolerance and iteration cap.
    pub fn with_solver(mut self, tolerance: Real, max_iterations: usize) -> Self {
        self.cg_tolerance = tolerance;
        self.cg_max_iterations = max_iterations;
        self
    }

    /// Sets the solver preconditioner.
    pub fn with_preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    /// Sets the iso-level policy.
    pub fn with_iso_level(mut self, iso_level: IsoLevel) -> Self {
        self.iso_level = iso_level;
        self
    }

    /// Sets the depth safety ceiling.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Checks every parameter is in its valid range.
    pub fn validate(&self) -> Result<(), ReconstructionError> {
        let invalid = |name, value| Err(ReconstructionError::InvalidParameter { name, value });

        if self.depth == 0 {
            return invalid("depth", 0.0);
        }
        if self.max_depth > HARD_MAX_DEPTH {
            return invalid("max_depth", self.max_depth as Real);
        }
        if self.depth > self.max_depth {
            return Err(ReconstructionError::ResolutionTooLarge {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }
        if !self.scale.is_finite() || self.scale <= 1.0 {
            return invalid("scale", self.scale);
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return invalid("alpha", self.alpha);
        }
        if !self.cg_tolerance.is_finite() || self.cg_tolerance <= 0.0 {
            return invalid("cg_tolerance", self.cg_tolerance);
        }
        if self.cg_max_iterations == 0 {
            return invalid("cg_max_iterations", 0.0);
        }
        if let IsoLevel::Fixed(level) = self.iso_level {
            if !level.is_finite() {
                return invalid("iso_level", level);
            }
        }

        Ok(())
    }

    fn solver(&self) -> ConjugateGradient {
        ConjugateGradient {
            tolerance: self.cg_tolerance,
            max_iterations: self.cg_max_iterations,
            preconditioner: self.preconditioner,
        }
    }
}

fn validate_samples(
    points: &[Point3<Real>],
    normals: &[Vector3<Real>],
) -> Result<(), ReconstructionError> {
    if points.len() != normals.len() {
        return Err(ReconstructionError::MismatchedLengths {
            points: points.len(),
            normals: normals.len(),
        });
    }

    if points.is_empty() {
        return Err(ReconstructionError::EmptyInput);
    }

    if let Some(index) = points
        .iter()
        .zip(normals.iter())
        .position(|(pt, n)| !pt.iter().chain(n.iter()).all(|e| e.is_finite()))
    {
        return Err(ReconstructionError::NonFiniteInput { index });
    }

    Ok(())
}

/// An implicit surface reconstructed with the Screened Poisson reconstruction algorithm
/// on a dense grid.
#[derive(Clone, Debug)]
pub struct PoissonReconstruction {
    grid: DenseGrid,
    normalizer: CoordinateNormalizer,
    solve_report: SolveReport,
    isovalue: Real,
}

impl PoissonReconstruction {
    /// Reconstruct an implicit surface using the Screened Poisson reconstruction algorithm,
    /// given a set of sample points and normals at these points.
    ///
    /// # Parameters
    /// - `points`: the sample points.
    /// - `normals`: the normals at the sample points, already oriented outwards. Must have
    ///   the same length as `points`.
    /// - `params`: the grid, screening and solver parameters.
    ///
    /// A solver that does not reach its tolerance is not an error: the warning is logged
    /// and available from [`Self::solve_report`].
    pub fn from_points_and_normals(
        points: &[Point3<Real>],
        normals: &[Vector3<Real>],
        params: &ReconstructionParams,
    ) -> Result<Self, ReconstructionError> {
        params.validate()?;
        validate_samples(points, normals)?;

        let grid = DenseGrid::new(params.depth);
        let resolution = grid.resolution();

        if resolution > params.warn_resolution {
            log::warn!(
                "resolution {}³ ({} unknowns) may be slow and memory intensive",
                resolution,
                grid.num_nodes()
            );
        }

        let normalizer = CoordinateNormalizer::from_points(points, params.scale)?;
        let unit_points: Vec<_> = points.iter().map(|pt| normalizer.normalize(pt)).collect();

        log::info!(
            "splatting {} normals into a {}³ grid",
            points.len(),
            resolution
        );
        let vector_field = splat_normals(&grid, &unit_points, normals);

        log::info!("computing divergence");
        let rhs = divergence(&grid, &vector_field);

        log::info!("assembling screened Laplacian (alpha = {:e})", params.alpha);
        let lhs = assemble_screened_laplacian(&grid, params.alpha);
        log::debug!("system has {} non-zeros", lhs.nnz());

        log::info!("solving for {} unknowns", lhs.nrows());
        let solve_report = params.solver().solve(&lhs, &rhs);

        match solve_report.warning() {
            Some(warning) => log::warn!("{}", warning),
            None => log::info!(
                "solver converged after {} iterations",
                solve_report.iterations
            ),
        }

        let isovalue = params.iso_level.resolve(&solve_report.solution);

        Ok(Self {
            grid,
            normalizer,
            solve_report,
            isovalue,
        })
    }

    /// The grid the field was solved on.
    pub fn grid(&self) -> &DenseGrid {
        &self.grid
    }

    /// The world ↔ unit-cube mapping of this reconstruction.
    pub fn normalizer(&self) -> &CoordinateNormalizer {
        &self.normalizer
    }

    /// The solved scalar field, one value per grid node.
    pub fn solution(&self) -> &DVector<Real> {
        &self.solve_report.solution
    }

    /// Convergence information of the linear solve.
    pub fn solve_report(&self) -> &SolveReport {
        &self.solve_report
    }

    /// The level of the extracted isosurface.
    pub fn iso_level(&self) -> Real {
        self.isovalue
    }

    /// Evaluates the implicit function at the given world-space point, relative to the
    /// iso-level: positive inside the surface, negative outside.
    ///
    /// Returns `None` if the point lies outside of the grid.
    pub fn eval(&self, pt: &Point3<Real>) -> Option<Real> {
        let lattice_scale = (self.grid.resolution() - 1) as Real;
        let scaled = self.normalizer.normalize_unclamped(pt).coords * lattice_scale;

        if !scaled.iter().all(|e| (0.0..=lattice_scale).contains(e)) {
            return None;
        }

        let (base, bcoords) = interpolation_cell(&self.grid, &scaled);
        let coeffs = trilinear_weights(&bcoords);
        let solution = self.solution();
        let value: Real = CORNERS
            .iter()
            .zip(coeffs.iter())
            .map(|(corner_shift, coeff)| solution[self.grid.index(&(base + corner_shift))] * *coeff)
            .sum();

        Some(value - self.isovalue)
    }

    /// Extracts the isosurface of the implicit function with marching cubes, in world
    /// coordinates.
    pub fn reconstruct_mesh(&self) -> Result<Mesh, ReconstructionError> {
        log::info!("extracting isosurface at level {:.6}", self.isovalue);
        let mesh = extract_isosurface(&self.grid, self.solution(), IsoLevel::Fixed(self.isovalue))?;
        log::info!(
            "extracted {} vertices and {} triangles",
            mesh.num_vertices(),
            mesh.num_triangles()
        );

        Ok(mesh.map_vertices(|v| self.normalizer.denormalize(v)))
    }
}

/// Reconstructs a mesh from oriented samples.
pub fn reconstruct(
    points: &[Point3<Real>],
    normals: &[Vector3<Real>],
    params: &ReconstructionParams,
) -> Result<Mesh, ReconstructionError> {
    PoissonReconstruction::from_points_and_normals(points, normals, params)?.reconstruct_mesh()
}

/// Like [`reconstruct`], but returns the empty mesh alongside the error on failure, for
/// pipelines that continue after a failed reconstruction.
pub fn reconstruct_or_empty(
    points: &[Point3<Real>],
    normals: &[Vector3<Real>],
    params: &ReconstructionParams,
) -> (Mesh, Option<ReconstructionError>) {
    match reconstruct(points, normals, params) {
        Ok(mesh) => (mesh, None),
        Err(err) => {
            log::warn!("reconstruction failed: {}", err);
            (Mesh::empty(), Some(err))
        }
    }
}

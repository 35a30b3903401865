use crate::Real;

/// Broad category of a [`ReconstructionError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The point cloud or the parameters cannot be reconstructed from.
    Input,
    /// The requested grid exceeds the configured safety ceiling.
    Resource,
    /// The solved field has no isosurface crossing at the chosen level.
    Extraction,
}

/// Errors aborting a reconstruction.
///
/// Solver non-convergence is not part of this enum: it is reported as a
/// [`ConvergenceWarning`](crate::ConvergenceWarning) and processing continues.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ReconstructionError {
    /// No sample was given.
    #[error("the point cloud is empty")]
    EmptyInput,
    /// Points and normals have different lengths.
    #[error("exactly one normal per point must be provided (got {points} points and {normals} normals)")]
    MismatchedLengths {
        /// Number of points.
        points: usize,
        /// Number of normals.
        normals: usize,
    },
    /// A position or a normal contains a NaN or an infinite coordinate.
    #[error("sample {index} has a non-finite position or normal")]
    NonFiniteInput {
        /// Index of the offending sample.
        index: usize,
    },
    /// The bounding box of the samples has a (near) zero extent.
    #[error("degenerate input: bounding box extent {extent} is too small to normalize")]
    DegenerateInput {
        /// Largest extent of the bounding box.
        extent: Real,
    },
    /// A reconstruction parameter is out of its valid range.
    #[error("invalid value {value} for parameter `{name}`")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: Real,
    },
    /// The requested depth is larger than the configured ceiling.
    #[error("grid depth {depth} exceeds the configured ceiling {max_depth}")]
    ResolutionTooLarge {
        /// Requested depth.
        depth: u32,
        /// Configured ceiling.
        max_depth: u32,
    },
    /// Marching cubes found no crossing at the iso-level.
    #[error("no isosurface crossing at level {level}")]
    EmptyIsosurface {
        /// The iso-level that was used.
        level: Real,
    },
}

impl ReconstructionError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput
            | Self::MismatchedLengths { .. }
            | Self::NonFiniteInput { .. }
            | Self::DegenerateInput { .. }
            | Self::InvalidParameter { .. } => ErrorKind::Input,
            Self::ResolutionTooLarge { .. } => ErrorKind::Resource,
            Self::EmptyIsosurface { .. } => ErrorKind::Extraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ReconstructionError::EmptyInput.kind(), ErrorKind::Input);
        assert_eq!(
            ReconstructionError::DegenerateInput { extent: 0.0 }.kind(),
            ErrorKind::Input
        );
        assert_eq!(
            ReconstructionError::ResolutionTooLarge {
                depth: 10,
                max_depth: 8
            }
            .kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            ReconstructionError::EmptyIsosurface { level: 0.0 }.kind(),
            ErrorKind::Extraction
        );
    }

    #[test]
    fn messages() {
        let err = ReconstructionError::MismatchedLengths {
            points: 3,
            normals: 2,
        };
        assert_eq!(
            err.to_string(),
            "exactly one normal per point must be provided (got 3 points and 2 normals)"
        );
    }
}

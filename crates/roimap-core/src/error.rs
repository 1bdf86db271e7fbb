/// Invalid camera or pose parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("extrinsic matrix bottom row must be [0, 0, 0, 1], got {row:?}")]
    BadBottomRow { row: [f64; 4] },

    #[error("extrinsic rotation is not orthonormal (|RᵀR - I| = {orthogonality_error:.3e}, det = {determinant:.6})")]
    NotARotation {
        orthogonality_error: f64,
        determinant: f64,
    },

    #[error("{what} contains non-finite values")]
    NonFinite { what: &'static str },

    #[error("focal lengths must be positive (fx={fx}, fy={fy})")]
    NonPositiveFocal { fx: f64, fy: f64 },
}

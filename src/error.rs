use thiserror::Error;

/// Errors reported by the windowed regression queries.
///
/// Precondition violations (dimension mismatch, a delimiter inside a symbol,
/// zero-sized windows) are caller bugs and panic instead of showing up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    /// No bucket has closed yet, so there is no time baseline to build a series on.
    #[error("window has no closed buckets to establish a time baseline")]
    NoHistory,
    /// The series is too short for the requested polynomial degree.
    #[error("not enough buckets ({have} out of {need}) to apply polynomial regression for degree {degree}")]
    NotEnoughBuckets {
        /// Points available
        have: usize,
        /// Points required
        need: usize,
        /// Requested degree
        degree: usize,
    },
    /// The x and y series differ in length.
    #[error("series length mismatch: {xs} x values vs {ys} y values")]
    LengthMismatch {
        /// Length of the x series
        xs: usize,
        /// Length of the y series
        ys: usize,
    },
    /// The least squares solver could not produce coefficients.
    #[error("least squares fit failed: {0}")]
    Fit(String),
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, BufferError>;

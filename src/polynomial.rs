//! Ordinary least squares polynomial fitting.

use nalgebra::{DMatrix, DVector};

use crate::{BufferError, Result};

/// Fits `ys` against `xs` with an ordinary least squares polynomial of the given degree.
///
/// # Arguments
///
/// * `xs` - The x axis
/// * `ys` - The observed values
/// * `degree` - The polynomial degree
///
/// # Returns
///
/// * `Result<Vec<f64>>` - The coefficients `c` of `c[0] + c[1]x + c[2]x^2 + ...`
pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>> {
    if xs.len() != ys.len() {
        return Err(BufferError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if ys.len() < degree + 1 {
        return Err(BufferError::NotEnoughBuckets {
            have: ys.len(),
            need: degree + 1,
            degree,
        });
    }

    let a = vandermonde(xs, degree);
    let b = DVector::from_column_slice(ys);
    let c = a
        .svd(true, true)
        .solve(&b, f64::EPSILON)
        .map_err(|e| BufferError::Fit(e.to_string()))?;

    if c.iter().any(|v| !v.is_finite()) {
        return Err(BufferError::Fit("coefficients are not finite".to_string()));
    }
    Ok(c.iter().copied().collect())
}

fn vandermonde(xs: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(xs.len(), degree + 1, |i, j| xs[i].powi(j as i32))
}

/// Evaluates the polynomial with the given coefficients at `x`.
pub fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn fits_linear_series() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 3.0).collect();
        let Ok(c) = fit(&xs, &ys, 1) else {
            panic!("linear fit should succeed");
        };
        assert_eq!(c.len(), 2);
        assert_approx_eq!(c[0], 3.0, 1e-9);
        assert_approx_eq!(c[1], 2.0, 1e-9);
    }

    #[test]
    fn fits_quadratic_series() {
        let xs: Vec<f64> = (0..6).map(|x| x as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x * x - x + 4.0).collect();
        let Ok(c) = fit(&xs, &ys, 2) else {
            panic!("quadratic fit should succeed");
        };
        assert_approx_eq!(c[0], 4.0, 1e-9);
        assert_approx_eq!(c[1], -1.0, 1e-9);
        assert_approx_eq!(c[2], 0.5, 1e-9);
        assert_approx_eq!(evaluate(&c, 10.0), 44.0, 1e-6);
    }

    #[test]
    fn least_squares_on_noisy_points() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 2.0, 2.0];
        let Ok(c) = fit(&xs, &ys, 1) else {
            panic!("fit should succeed");
        };
        assert_approx_eq!(c[0], 7.0 / 6.0, 1e-9);
        assert_approx_eq!(c[1], 0.5, 1e-9);
    }

    #[test]
    fn rejects_short_series() {
        let err = fit(&[1.0], &[1.0], 1);
        assert_eq!(
            err,
            Err(BufferError::NotEnoughBuckets {
                have: 1,
                need: 2,
                degree: 1
            })
        );
    }

    #[test]
    fn rejects_mismatched_series() {
        let err = fit(&[1.0, 2.0], &[1.0], 0);
        assert_eq!(err, Err(BufferError::LengthMismatch { xs: 2, ys: 1 }));
    }

    #[test]
    fn evaluate_uses_ascending_powers() {
        assert_approx_eq!(evaluate(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(evaluate(&[], 2.0), 0.0);
    }
}

//! Ordinary least squares
//!
//! Solves `min ||X b - y||` through the normal equations. The systems
//! here are small (a handful of lag coefficients), so Gaussian
//! elimination with partial pivoting is sufficient.

use crate::{MathError, Result};

/// Pivot magnitude below which a system is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Fitted least squares coefficients with the residuals they leave
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    /// One coefficient per design column
    pub coefficients: Vec<f64>,
    /// `y - X b` for every row
    pub residuals: Vec<f64>,
}

/// Fit `target ~ design` by ordinary least squares.
///
/// Each entry of `design` is one row of regressors.
pub fn least_squares(design: &[Vec<f64>], target: &[f64]) -> Result<LeastSquaresFit> {
    if design.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            target.len()
        )));
    }

    let k = design.first().map(|row| row.len()).unwrap_or(0);
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }
    if design.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "Design rows have differing lengths".to_string(),
        ));
    }
    if design.len() < k {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} rows to estimate {} coefficients, got {}",
            k,
            k,
            design.len()
        )));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, y) in design.iter().zip(target) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let coefficients = solve(xtx, xty)?;
    let residuals = design
        .iter()
        .zip(target)
        .map(|(row, y)| y - dot(row, &coefficients))
        .collect();

    Ok(LeastSquaresFit {
        coefficients,
        residuals,
    })
}

/// Solve the square system `a x = b` by Gaussian elimination
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(
            "Linear system must be square".to_string(),
        ));
    }

    // Scale the tolerance to the matrix so that large-valued series are not
    // rejected as singular.
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        if a[pivot_row][col].abs() <= SINGULAR_TOLERANCE * scale {
            return Err(MathError::Singular(format!(
                "Matrix is singular at column {}",
                col
            )));
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|j| a[row][j] * x[j]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Solution contains non-finite values".to_string(),
        ));
    }

    Ok(x)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

//! Differencing and its inverse
//!
//! `difference` applies `(1 - B^lag)` to a series. `integrate` undoes one
//! such step for values that continue past the end of a known history.

use crate::{MathError, Result};

/// Apply one lag-`lag` difference: `y[t] - y[t - lag]`
pub fn difference(data: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Difference lag must be at least 1".to_string(),
        ));
    }
    if data.len() <= lag {
        return Err(MathError::InsufficientData(format!(
            "Differencing at lag {} needs more than {} observations",
            lag,
            data.len()
        )));
    }

    Ok((lag..data.len()).map(|i| data[i] - data[i - lag]).collect())
}

/// Invert one lag-`lag` difference for values following `history`.
///
/// `history` is the undifferenced series; `differenced` holds future
/// values of `(1 - B^lag) y`. Returns the future values of `y`.
pub fn integrate(history: &[f64], differenced: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Integration lag must be at least 1".to_string(),
        ));
    }
    if history.len() < lag {
        return Err(MathError::InsufficientData(format!(
            "Integration at lag {} needs at least {} historical values",
            lag, lag
        )));
    }

    let mut extended = history[history.len() - lag..].to_vec();
    for (i, value) in differenced.iter().enumerate() {
        let next = value + extended[i];
        extended.push(next);
    }

    Ok(extended.split_off(lag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        let data = [1.0, 4.0, 9.0, 16.0];
        let first = difference(&data, 1).unwrap();
        assert_eq!(first, vec![3.0, 5.0, 7.0]);
        assert_eq!(difference(&first, 1).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_seasonal_difference() {
        let data = [1.0, 2.0, 3.0, 11.0, 12.0, 13.0];
        assert_eq!(difference(&data, 3).unwrap(), vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_difference_too_short() {
        assert!(difference(&[1.0], 1).is_err());
        assert!(difference(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_integrate_inverts_difference() {
        let data = [5.0, 7.0, 6.0, 9.0, 12.0, 11.0];
        let (head, tail) = data.split_at(3);
        let diffs = difference(&data, 1).unwrap();
        let restored = integrate(head, &diffs[2..], 1).unwrap();
        assert_eq!(restored, tail.to_vec());

        let seasonal = difference(&data, 2).unwrap();
        let restored = integrate(head, &seasonal[1..], 2).unwrap();
        assert_eq!(restored, tail.to_vec());
    }
}

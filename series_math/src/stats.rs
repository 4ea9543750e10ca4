//! Summary statistics over slices

use crate::{MathError, Result};

/// Arithmetic mean
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty series".to_string(),
        ));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// True when every value lies within `tolerance` of the first
pub fn is_constant(data: &[f64], tolerance: f64) -> bool {
    match data.first() {
        Some(first) => data.iter().all(|x| (x - first).abs() <= tolerance),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data).unwrap(), 5.0);
    }

    #[test]
    fn test_empty_mean_fails() {
        assert!(matches!(mean(&[]), Err(MathError::InsufficientData(_))));
    }

    #[test]
    fn test_is_constant() {
        assert!(is_constant(&[1.0, 1.0, 1.0], 1e-12));
        assert!(!is_constant(&[1.0, 1.0, 1.1], 1e-12));
        assert!(is_constant(&[], 0.0));
    }
}

//! Lag polynomial utilities
//!
//! Polynomials are stored lowest power first, so `[1.0, -0.5]` is
//! `1 - 0.5B`. AR coefficients follow the convention
//! `y[t] = phi_1 y[t-1] + ... + e[t]`, i.e. the polynomial `1 - sum phi_i B^i`;
//! MA coefficients follow `e[t] + theta_1 e[t-1] + ...`.

/// Multiply two polynomials
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Monic polynomials `1 + c_1 x + ... + c_m x^m` have all roots strictly
/// outside the unit circle iff every reflection coefficient of the
/// step-down recursion has magnitude below one.
fn roots_outside_unit_circle(tail: &[f64]) -> bool {
    let mut c: Vec<f64> = tail.to_vec();
    while let Some(&last) = c.last() {
        if last == 0.0 {
            c.pop();
        } else {
            break;
        }
    }

    while let Some(&k) = c.last() {
        if !k.is_finite() || k.abs() >= 1.0 {
            return false;
        }
        let m = c.len();
        let denom = 1.0 - k * k;
        let reduced: Vec<f64> = (0..m - 1).map(|i| (c[i] - k * c[m - 2 - i]) / denom).collect();
        c = reduced;
    }
    true
}

/// True when the AR part `1 - sum phi_i B^i` is stationary
pub fn is_stationary(ar: &[f64]) -> bool {
    let tail: Vec<f64> = ar.iter().map(|phi| -phi).collect();
    roots_outside_unit_circle(&tail)
}

/// True when the MA part `1 + sum theta_j B^j` is invertible
pub fn is_invertible(ma: &[f64]) -> bool {
    roots_outside_unit_circle(ma)
}

/// Fold differencing into the AR polynomial.
///
/// Returns the coefficients `phi*` of `phi(B) (1 - B)^d (1 - B^s)^D`
/// written in the same `1 - sum phi*_i B^i` convention, where `seasonal`
/// is `Some(s)` for one seasonal difference.
pub fn integrated_ar(ar: &[f64], d: usize, seasonal: Option<usize>) -> Vec<f64> {
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|p| -p)).collect();
    for _ in 0..d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    if let Some(period) = seasonal.filter(|&s| s > 0) {
        let mut seasonal_poly = vec![0.0; period + 1];
        seasonal_poly[0] = 1.0;
        seasonal_poly[period] = -1.0;
        poly = multiply(&poly, &seasonal_poly);
    }
    poly.iter().skip(1).map(|c| -c).collect()
}

/// First `n` psi weights of the MA(infinity) representation of an ARMA
/// model with AR coefficients `ar` and MA coefficients `ma`.
pub fn psi_weights(ar: &[f64], ma: &[f64], n: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(n);
    for j in 0..n {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut value = if j <= ma.len() { ma[j - 1] } else { 0.0 };
        for i in 1..=ar.len().min(j) {
            value += ar[i - 1] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}

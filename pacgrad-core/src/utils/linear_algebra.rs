//! Linear algebra utilities.

/// Result of a first-degree least-squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fit a straight line to `(x, y)` by ordinary least squares.
///
/// Equivalent to a degree-1 polynomial fit. The sums are centred on the means
/// of `x` and `y` to keep the normal equations well conditioned for long
/// index ranges.
///
/// # Returns
/// `None` if fewer than two points are given, the lengths differ, `x` has no
/// spread, or the result is not finite (for example when `y` contains `NaN`).
///
/// # Example
/// ```
/// use pacgrad_core::utils::linear_algebra::linear_fit;
///
/// let x = vec![0.0, 1.0, 2.0, 3.0];
/// let y = vec![1.0, 3.0, 5.0, 7.0];
///
/// let fit = linear_fit(&x, &y).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// ```
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        sxx += dx * dx;
        sxy += dx * (yi - y_mean);
    }
    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    if slope.is_finite() && intercept.is_finite() {
        Some(LinearFit { slope, intercept })
    } else {
        None
    }
}

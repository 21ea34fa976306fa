/// Tolerance within which two action values count as tied
pub const TIE_TOLERANCE: f64 = 1e-4;

/// Checks that a numerical value is in the interval `[a,b]` and returns early
/// with [`Error::OutOfInterval`](crate::Error::OutOfInterval) if not
///
/// ### Example
/// ```
/// # fn check(value: f64) -> rl_lab::Result<()> {
/// rl_lab::ensure_interval!(value, 0.0, 1.0);
/// # Ok(())
/// # }
/// assert!(check(2.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure_interval {
    ($var:expr, $a:expr, $b:expr) => {
        if !($var >= $a && $var <= $b) {
            return Err($crate::Error::OutOfInterval {
                name: stringify!($var),
                value: $var as f64,
                min: $a,
                max: $b,
            });
        }
    };
}

/// Replace a non-finite number with zero
pub fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Sanitize a slice so that it only contains finite numbers
pub fn sanitize(values: &[f64]) -> Vec<f64> {
    values.iter().copied().map(finite_or_zero).collect()
}

/// Indices of the finite entries within [`TIE_TOLERANCE`] of the finite maximum
///
/// Returns an empty vector if no entry is finite.
pub fn near_max_indices(row: &[f64]) -> Vec<usize> {
    let max = row
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Vec::new();
    }

    row.iter()
        .enumerate()
        .filter(|(_, &x)| x.is_finite() && (x - max).abs() < TIE_TOLERANCE)
        .map(|(i, _)| i)
        .collect()
}

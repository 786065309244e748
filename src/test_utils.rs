/// Utility to compare floating-point values with a tolerance.
pub(crate) fn abs_diff_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

/// Assert that two floating-point quantities are approximately equal.
///
/// This macro asserts that the absolute difference between the two first
/// arguments is strictly less than a tolerance factor, which can be explicitly
/// passed as third argument or implicitly defaults to `1e-9`.
///
/// # Usage
///
/// ```ignore
/// let x = 3.5000000009;
/// assert_approx_eq!(x, 3.5);       // default tolerance 1e-9
///
/// let x = 3.509;
/// assert_approx_eq!(x, 3.5, 0.01); // explicit tolerance
/// ```
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                assert!(
                    crate::test_utils::abs_diff_eq(*left_val as f64, *right_val as f64, 1e-9),
                    "assertion failed: expected={} actual={} delta={} tol=1e-9(default)",
                    left_val,
                    right_val,
                    (*left_val as f64 - *right_val as f64).abs(),
                );
            }
        }
    };
    ($left:expr, $right:expr, $tol:expr $(,)?) => {
        match (&$left, &$right, &$tol) {
            (left_val, right_val, tol_val) => {
                assert!(
                    crate::test_utils::abs_diff_eq(*left_val as f64, *right_val as f64, *tol_val as f64),
                    "assertion failed: expected={} actual={} delta={} tol={}",
                    left_val,
                    right_val,
                    (*left_val as f64 - *right_val as f64).abs(),
                    tol_val
                );
            }
        }
    };
}

pub(crate) use assert_approx_eq;

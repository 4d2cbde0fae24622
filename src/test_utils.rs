// src/test_utils.rs

//! Tolerance helpers shared by the test modules.

use nalgebra::Vector3;

/// Absolute tolerance within which double precision values are considered
/// equal.
pub const TEST_TOLERANCE: f64 = 1e-9;

/// Absolute tolerance for single precision values, used by the generic PID
/// tests that run on `f32`.
pub const TEST_TOLERANCE_F32: f32 = 1e-5;

/// Checks if two double precision numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The expected value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f64, value: f64) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// Checks if two double precision numbers differ by at least the tolerance.
///
/// # Arguments
/// * `target` - The expected value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if `value_close` is `false`. A `NaN` on either side counts as not
/// close.
pub fn value_not_close(target: f64, value: f64) -> bool {
    !value_close(target, value)
}

/// Checks if two single precision numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The expected value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference is less than `TEST_TOLERANCE_F32`,
/// otherwise `false`.
pub fn value_close_f32(target: f32, value: f32) -> bool {
    (target - value).abs() < TEST_TOLERANCE_F32
}

/// Checks if every component of a state vector is close enough to be
/// considered equal.
///
/// # Arguments
/// * `target` - The expected vector.
/// * `value` - The vector to compare against the target.
///
/// # Returns
/// `true` if each pair of components is close as per `value_close`,
/// otherwise `false`.
pub fn vector_close(target: Vector3<f64>, value: Vector3<f64>) -> bool {
    target
        .iter()
        .zip(value.iter())
        .all(|(t, v)| value_close(*t, *v))
}

// src/physics/kinematics.rs

//! # Frame Kinematics
//!
//! Trigonometric cache and the body/earth frame conversions built on it.
//!
//! The rotation is the ZYX (yaw-pitch-roll) composition. The Euler-rate
//! transform divides by `cos(pitch)` and is singular at pitch = ±90°; this is
//! a known limitation of the Euler-angle representation and is not guarded.

use core::f64::consts::TAU;
use nalgebra::Vector3;

use super::{Angle, AngularVelocity, AngularVelocityBodyFrame, Velocity, VelocityBodyFrame};

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

/// Sign-preserving remainder by `2π`, the normalization applied to
/// measurements before they reach a controller stage.
pub fn normalize_radian(angle: f64) -> f64 {
    angle % TAU
}

/// Trigonometric values of a single Euler angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTrig {
    /// Sine.
    pub sin: f64,
    /// Cosine.
    pub cos: f64,
    /// Tangent.
    pub tan: f64,
    /// Secant.
    pub sec: f64,
}

impl AxisTrig {
    fn new(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        AxisTrig {
            sin,
            cos,
            tan: sin / cos,
            sec: 1.0 / cos,
        }
    }
}

/// Per-tick trigonometric cache of roll (φ), pitch (θ) and yaw (ψ).
///
/// Built once from the angle observed at the start of a tick and shared by
/// every frame conversion performed during that tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsCache {
    /// Roll.
    pub phi: AxisTrig,
    /// Pitch.
    pub theta: AxisTrig,
    /// Yaw.
    pub psi: AxisTrig,
}

impl KinematicsCache {
    /// Computes the cache from an Euler angle.
    pub fn new(angle: &Angle) -> Self {
        KinematicsCache {
            phi: AxisTrig::new(wrap_angle(angle.x)),
            theta: AxisTrig::new(wrap_angle(angle.y)),
            psi: AxisTrig::new(wrap_angle(angle.z)),
        }
    }
}

/// Rotates a body-frame vector into the earth frame.
pub fn body_to_earth(src: &Vector3<f64>, cache: &KinematicsCache) -> Vector3<f64> {
    let (sin_phi, cos_phi) = (cache.phi.sin, cache.phi.cos);
    let (sin_theta, cos_theta) = (cache.theta.sin, cache.theta.cos);
    let (sin_psi, cos_psi) = (cache.psi.sin, cache.psi.cos);

    Vector3::new(
        cos_theta * cos_psi * src.x
            + (sin_phi * sin_theta * cos_psi - cos_phi * sin_psi) * src.y
            + (cos_phi * sin_theta * cos_psi + sin_phi * sin_psi) * src.z,
        cos_theta * sin_psi * src.x
            + (sin_phi * sin_theta * sin_psi + cos_phi * cos_psi) * src.y
            + (cos_phi * sin_theta * sin_psi - sin_phi * cos_psi) * src.z,
        -sin_theta * src.x + sin_phi * cos_theta * src.y + cos_phi * cos_theta * src.z,
    )
}

/// Rotates an earth-frame vector into the body frame (transpose of
/// [`body_to_earth`]).
pub fn earth_to_body(src: &Vector3<f64>, cache: &KinematicsCache) -> Vector3<f64> {
    let (sin_phi, cos_phi) = (cache.phi.sin, cache.phi.cos);
    let (sin_theta, cos_theta) = (cache.theta.sin, cache.theta.cos);
    let (sin_psi, cos_psi) = (cache.psi.sin, cache.psi.cos);

    Vector3::new(
        cos_theta * cos_psi * src.x + cos_theta * sin_psi * src.y - sin_theta * src.z,
        (sin_phi * sin_theta * cos_psi - cos_phi * sin_psi) * src.x
            + (sin_phi * sin_theta * sin_psi + cos_phi * cos_psi) * src.y
            + sin_phi * cos_theta * src.z,
        (cos_phi * sin_theta * cos_psi + sin_phi * sin_psi) * src.x
            + (cos_phi * sin_theta * sin_psi - sin_phi * cos_psi) * src.y
            + cos_phi * cos_theta * src.z,
    )
}

/// Body-frame linear velocity to earth-frame velocity.
pub fn body_to_earth_velocity(src: &VelocityBodyFrame, cache: &KinematicsCache) -> Velocity {
    body_to_earth(src, cache)
}

/// Earth-frame velocity to body-frame linear velocity.
pub fn earth_to_body_velocity(src: &Velocity, cache: &KinematicsCache) -> VelocityBodyFrame {
    earth_to_body(src, cache)
}

/// Body-frame angular velocity `(p, q, r)` to Euler rates.
pub fn body_to_earth_angular_rate(
    src: &AngularVelocityBodyFrame,
    cache: &KinematicsCache,
) -> AngularVelocity {
    let (sin_phi, cos_phi) = (cache.phi.sin, cache.phi.cos);
    let (tan_theta, sec_theta) = (cache.theta.tan, cache.theta.sec);

    Vector3::new(
        src.x + sin_phi * tan_theta * src.y + cos_phi * tan_theta * src.z,
        cos_phi * src.y - sin_phi * src.z,
        sin_phi * sec_theta * src.y + cos_phi * sec_theta * src.z,
    )
}

/// Euler rates to body-frame angular velocity `(p, q, r)`.
pub fn earth_to_body_angular_rate(
    src: &AngularVelocity,
    cache: &KinematicsCache,
) -> AngularVelocityBodyFrame {
    let (sin_phi, cos_phi) = (cache.phi.sin, cache.phi.cos);
    let (sin_theta, cos_theta) = (cache.theta.sin, cache.theta.cos);

    Vector3::new(
        src.x - sin_theta * src.z,
        cos_phi * src.y + sin_phi * cos_theta * src.z,
        -sin_phi * src.y + cos_phi * cos_theta * src.z,
    )
}

// src/physics.rs

//! # Rigid-Body Physics Module
//!
//! Single rigid-body drone dynamics with Euler-angle kinematics, explicit
//! Euler integration at a fixed tick, restitution-based collision response,
//! and a ground plane at `z = 0`.
//!
//! The earth frame is north-east-down: `z` grows toward the ground, so the
//! vehicle is airborne while `z < 0`.

use nalgebra::Vector3;

pub mod body_frame;
pub use body_frame::*;
pub mod collision;
pub use collision::*;
pub mod dynamics;
pub use dynamics::*;
pub mod ground_frame;
pub use ground_frame::*;
pub mod kinematics;
pub use kinematics::*;

/// Earth-frame position.
pub type Position = Vector3<f64>;
/// Earth-frame linear velocity.
pub type Velocity = Vector3<f64>;
/// Body-frame linear velocity `(u, v, w)`.
pub type VelocityBodyFrame = Vector3<f64>;
/// Euler angle `(roll, pitch, yaw)`.
pub type Angle = Vector3<f64>;
/// Euler rates `(roll rate, pitch rate, yaw rate)`.
pub type AngularVelocity = Vector3<f64>;
/// Body-frame angular velocity `(p, q, r)`.
pub type AngularVelocityBodyFrame = Vector3<f64>;
/// Body-frame force command.
pub type Thrust = Vector3<f64>;
/// Body-frame moment command.
pub type Torque = Vector3<f64>;

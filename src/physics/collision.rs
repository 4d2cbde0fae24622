// src/physics/collision.rs

//! # Collision Response
//!
//! Restitution-law impulse response for a single contact point. The normal
//! component of the velocity relative to the contact direction is reversed
//! and scaled by the restitution coefficient; the tangential component is
//! kept as is (no friction model).

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Position, Velocity};

/// Optional per-tick collision input.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionInput {
    /// Whether the contact is active this tick.
    pub collision: bool,
    /// Contact point offset from the body center, per axis, normalized to
    /// the body half-extents (`-1.0..=1.0` spans the body).
    pub contact_offset: Vector3<f64>,
    /// Restitution coefficient in `[0, 1]`.
    pub restitution_coefficient: f64,
}

impl CollisionInput {
    /// An active contact at `contact_offset` with restitution `e`.
    pub fn new(contact_offset: Vector3<f64>, restitution_coefficient: f64) -> Self {
        CollisionInput {
            collision: true,
            contact_offset,
            restitution_coefficient,
        }
    }

    /// Earth-frame position of the contact point.
    pub fn contact_position(&self, center: &Position, half_extents: &Vector3<f64>) -> Position {
        center + self.contact_offset.component_mul(half_extents)
    }
}

impl Default for CollisionInput {
    fn default() -> Self {
        CollisionInput {
            collision: false,
            contact_offset: Vector3::zeros(),
            restitution_coefficient: 0.0,
        }
    }
}

/// Velocity right after contact.
///
/// `contact` equal to `center` has no direction and yields NaN components.
pub fn velocity_after_contact(
    velocity: &Velocity,
    center: &Position,
    contact: &Position,
    restitution_coefficient: f64,
) -> Velocity {
    let normal = (contact - center).normalize();
    let normal_velocity = normal * velocity.dot(&normal);
    let tangential_velocity = velocity - normal_velocity;

    tangential_velocity - normal_velocity * restitution_coefficient
}

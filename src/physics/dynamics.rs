// src/physics/dynamics.rs

//! # Rigid-Body Dynamics Interface
//!
//! The `RigidBodyDynamics` trait, its configuration and per-tick input, the
//! physical state shared by every implementation, and the tick stages that
//! do not depend on the integration frame (collision, pose integration,
//! ground contact).

use log::{debug, trace, warn};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    earth_to_body_velocity, velocity_after_contact, Angle, AngularVelocity,
    AngularVelocityBodyFrame, BodyFrameDynamics, CollisionInput, GroundFrameDynamics,
    KinematicsCache, Position, Thrust, Torque, Velocity, VelocityBodyFrame,
};
use crate::Error;

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.81;

/// Physical constants of the simulated body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DynamicsConfig {
    /// Fixed tick interval in seconds.
    pub delta_time_sec: f64,
    /// Mass in kg.
    pub mass: f64,
    /// Linear drag coefficient in kg/s.
    pub drag: f64,
    /// Gravitational acceleration in m/s², acting along earth +z.
    pub gravity: f64,
    /// Per-axis torque constants (principal moments of inertia).
    pub torque_constants: Vector3<f64>,
    /// Half-extents of the body box, used to place contact points.
    pub half_extents: Vector3<f64>,
}

impl DynamicsConfig {
    /// Creates a configuration with unit mass, no drag, unit torque
    /// constants, and standard gravity.
    pub fn new(delta_time_sec: f64) -> Self {
        DynamicsConfig {
            delta_time_sec,
            mass: 1.0,
            drag: 0.0,
            gravity: GRAVITY,
            torque_constants: Vector3::new(1.0, 1.0, 1.0),
            half_extents: Vector3::new(0.1, 0.1, 0.1),
        }
    }

    /// Rejects parameters the integrator cannot use.
    pub fn validate(&self) -> Result<(), Error> {
        let reason = if !(self.delta_time_sec.is_finite() && self.delta_time_sec > 0.0) {
            Some("delta_time_sec must be positive")
        } else if !(self.mass.is_finite() && self.mass > 0.0) {
            Some("mass must be positive")
        } else if !(self.drag >= 0.0) {
            Some("drag must not be negative")
        } else if self.torque_constants.iter().any(|c| !(*c > 0.0)) {
            Some("torque constants must be positive")
        } else if self.half_extents.iter().any(|h| !(*h >= 0.0)) {
            Some("half extents must not be negative")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                warn!("rejected dynamics configuration: {}", reason);
                Err(Error::InvalidConfig(reason))
            }
            None => Ok(()),
        }
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self::new(0.001)
    }
}

/// Input consumed by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsInput {
    /// Body-frame force.
    pub thrust: Thrust,
    /// Body-frame moment.
    pub torque: Torque,
    /// Contact for this tick, if any.
    pub collision: Option<CollisionInput>,
}

impl DynamicsInput {
    /// Thrust and torque without contact.
    pub fn new(thrust: Thrust, torque: Torque) -> Self {
        DynamicsInput {
            thrust,
            torque,
            collision: None,
        }
    }

    /// Attaches a contact to the input.
    pub fn with_collision(mut self, collision: CollisionInput) -> Self {
        self.collision = Some(collision);
        self
    }
}

impl Default for DynamicsInput {
    fn default() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }
}

/// Physical state of the body in both frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneState {
    /// Earth-frame position.
    pub position: Position,
    /// Earth-frame velocity.
    pub velocity: Velocity,
    /// Body-frame velocity.
    pub velocity_body_frame: VelocityBodyFrame,
    /// Euler angle.
    pub angle: Angle,
    /// Euler rates.
    pub angular_velocity: AngularVelocity,
    /// Body-frame angular velocity.
    pub angular_velocity_body_frame: AngularVelocityBodyFrame,
    /// Elapsed simulation time in seconds.
    pub total_time_sec: f64,
}

impl Default for DroneState {
    fn default() -> Self {
        DroneState {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            velocity_body_frame: Vector3::zeros(),
            angle: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            angular_velocity_body_frame: Vector3::zeros(),
            total_time_sec: 0.0,
        }
    }
}

/// Fixed-step rigid-body dynamics.
///
/// Every implementation runs the same stage order per tick: refresh the
/// kinematics cache, compute accelerations, integrate velocities, convert
/// frames, apply the collision, integrate position and orientation, enforce
/// ground contact, advance time.
///
/// Setters keep the paired frame representation consistent with the
/// current angle.
pub trait RigidBodyDynamics {
    /// Advances the state by one tick.
    fn run(&mut self, input: &DynamicsInput);

    /// Re-derives the secondary frame representation from the primary one.
    fn sync_frames(&mut self);

    /// Physical state.
    fn state(&self) -> &DroneState;

    /// Mutable physical state. Writes through this bypass frame syncing.
    fn state_mut(&mut self) -> &mut DroneState;

    /// Physical constants.
    fn config(&self) -> &DynamicsConfig;

    /// Restores the zero state and clock.
    fn reset(&mut self) {
        *self.state_mut() = DroneState::default();
    }

    /// Fixed tick interval in seconds.
    fn delta_time_sec(&self) -> f64 {
        self.config().delta_time_sec
    }

    /// Elapsed simulation time in seconds.
    fn total_time_sec(&self) -> f64 {
        self.state().total_time_sec
    }

    /// Earth-frame position.
    fn position(&self) -> Position {
        self.state().position
    }

    /// Earth-frame velocity.
    fn velocity(&self) -> Velocity {
        self.state().velocity
    }

    /// Body-frame velocity.
    fn velocity_body_frame(&self) -> VelocityBodyFrame {
        self.state().velocity_body_frame
    }

    /// Euler angle.
    fn angle(&self) -> Angle {
        self.state().angle
    }

    /// Euler rates.
    fn angular_velocity(&self) -> AngularVelocity {
        self.state().angular_velocity
    }

    /// Body-frame angular velocity.
    fn angular_velocity_body_frame(&self) -> AngularVelocityBodyFrame {
        self.state().angular_velocity_body_frame
    }

    /// Sets the earth-frame position.
    fn set_position(&mut self, position: Position) {
        self.state_mut().position = position;
    }

    /// Sets the earth-frame velocity and the matching body-frame velocity.
    fn set_velocity(&mut self, velocity: Velocity) {
        let state = self.state_mut();
        let cache = KinematicsCache::new(&state.angle);
        state.velocity = velocity;
        state.velocity_body_frame = earth_to_body_velocity(&velocity, &cache);
    }

    /// Sets the body-frame velocity and the matching earth-frame velocity.
    fn set_velocity_body_frame(&mut self, velocity: VelocityBodyFrame) {
        let state = self.state_mut();
        let cache = KinematicsCache::new(&state.angle);
        state.velocity_body_frame = velocity;
        state.velocity = super::body_to_earth_velocity(&velocity, &cache);
    }

    /// Sets the Euler angle and re-derives the secondary frame.
    fn set_angle(&mut self, angle: Angle) {
        self.state_mut().angle = angle;
        self.sync_frames();
    }

    /// Sets the Euler rates and the matching body-frame angular velocity.
    fn set_angular_velocity(&mut self, angular_velocity: AngularVelocity) {
        let state = self.state_mut();
        let cache = KinematicsCache::new(&state.angle);
        state.angular_velocity = angular_velocity;
        state.angular_velocity_body_frame =
            super::earth_to_body_angular_rate(&angular_velocity, &cache);
    }

    /// Sets the body-frame angular velocity and the matching Euler rates.
    fn set_angular_velocity_body_frame(&mut self, angular_velocity: AngularVelocityBodyFrame) {
        let state = self.state_mut();
        let cache = KinematicsCache::new(&state.angle);
        state.angular_velocity_body_frame = angular_velocity;
        state.angular_velocity = super::body_to_earth_angular_rate(&angular_velocity, &cache);
    }
}

impl<D: RigidBodyDynamics + ?Sized> RigidBodyDynamics for Box<D> {
    fn run(&mut self, input: &DynamicsInput) {
        (**self).run(input)
    }

    fn sync_frames(&mut self) {
        (**self).sync_frames()
    }

    fn state(&self) -> &DroneState {
        (**self).state()
    }

    fn state_mut(&mut self) -> &mut DroneState {
        (**self).state_mut()
    }

    fn config(&self) -> &DynamicsConfig {
        (**self).config()
    }
}

/// Integration frame of a dynamics implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DynamicsFrame {
    /// Integrates the Newton-Euler equations in the body frame.
    BodyFrame,
    /// Integrates directly in the earth frame.
    GroundFrame,
}

/// Builds the dynamics implementation for `frame`.
pub fn build_dynamics(
    frame: DynamicsFrame,
    config: DynamicsConfig,
) -> Result<Box<dyn RigidBodyDynamics + Send>, Error> {
    debug!("building {:?} dynamics: {:?}", frame, config);
    Ok(match frame {
        DynamicsFrame::BodyFrame => Box::new(BodyFrameDynamics::new(config)?),
        DynamicsFrame::GroundFrame => Box::new(GroundFrameDynamics::new(config)?),
    })
}

/// Replaces the earth-frame velocity with the post-contact velocity when the
/// collision is active, then re-derives the body-frame velocity.
pub(crate) fn apply_collision(
    state: &mut DroneState,
    cache: &KinematicsCache,
    half_extents: &Vector3<f64>,
    collision: Option<&CollisionInput>,
) {
    let Some(collision) = collision.filter(|c| c.collision) else {
        return;
    };
    let contact = collision.contact_position(&state.position, half_extents);
    state.velocity = velocity_after_contact(
        &state.velocity,
        &state.position,
        &contact,
        collision.restitution_coefficient,
    );
    state.velocity_body_frame = earth_to_body_velocity(&state.velocity, cache);
    trace!(
        "collision at {:?}, velocity after contact {:?}",
        contact,
        state.velocity
    );
}

/// Explicit Euler step of position and orientation.
pub(crate) fn integrate_pose(state: &mut DroneState, delta_time_sec: f64) {
    state.position += state.velocity * delta_time_sec;
    state.angle += state.angular_velocity * delta_time_sec;
}

/// Keeps the body on or above the ground plane.
pub(crate) fn apply_ground_contact(state: &mut DroneState) {
    if state.position.z > 0.0 {
        trace!("ground contact at t = {:.6}", state.total_time_sec);
        state.position.z = 0.0;
        state.velocity.z = 0.0;
        state.velocity_body_frame.z = 0.0;
    }
}

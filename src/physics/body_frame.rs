// src/physics/body_frame.rs

//! # Body-Frame Dynamics
//!
//! Newton-Euler equations integrated in the body frame. Linear acceleration
//! includes the gravity projection, the Coriolis coupling `ω × v` and linear
//! drag; angular acceleration includes the gyroscopic term `ω × (C ⊙ ω)`.
//! The earth-frame velocities are derived from the body-frame ones every
//! tick.

use log::debug;
use nalgebra::Vector3;

use super::{
    apply_collision, apply_ground_contact, body_to_earth_angular_rate, body_to_earth_velocity,
    integrate_pose, DroneState, DynamicsConfig, DynamicsInput, KinematicsCache,
    RigidBodyDynamics, Thrust, Torque,
};
use crate::Error;

/// Rigid-body dynamics integrated in the body frame.
#[derive(Debug, Clone)]
pub struct BodyFrameDynamics {
    config: DynamicsConfig,
    state: DroneState,
}

impl BodyFrameDynamics {
    /// Creates the dynamics at rest at the origin.
    pub fn new(config: DynamicsConfig) -> Result<Self, Error> {
        config.validate()?;
        debug!("body-frame dynamics: {:?}", config);
        Ok(BodyFrameDynamics {
            config,
            state: DroneState::default(),
        })
    }

    /// Body-frame linear acceleration `(u̇, v̇, ẇ)`.
    fn linear_acceleration(&self, thrust: &Thrust, cache: &KinematicsCache) -> Vector3<f64> {
        let DynamicsConfig {
            mass, drag, gravity, ..
        } = self.config;
        let v = &self.state.velocity_body_frame;
        let w = &self.state.angular_velocity_body_frame;
        let (sin_phi, cos_phi) = (cache.phi.sin, cache.phi.cos);
        let (sin_theta, cos_theta) = (cache.theta.sin, cache.theta.cos);

        let gravity_body = Vector3::new(
            -gravity * sin_theta,
            gravity * cos_theta * sin_phi,
            gravity * cos_theta * cos_phi,
        );

        thrust / mass + gravity_body - w.cross(v) - v * (drag / mass)
    }

    /// Body-frame angular acceleration `(ṗ, q̇, ṙ)`.
    fn angular_acceleration(&self, torque: &Torque) -> Vector3<f64> {
        let constants = &self.config.torque_constants;
        let w = &self.state.angular_velocity_body_frame;
        let gyroscopic = w.cross(&w.component_mul(constants));

        (torque - gyroscopic).component_div(constants)
    }
}

impl RigidBodyDynamics for BodyFrameDynamics {
    fn run(&mut self, input: &DynamicsInput) {
        let dt = self.config.delta_time_sec;
        let cache = KinematicsCache::new(&self.state.angle);

        let linear = self.linear_acceleration(&input.thrust, &cache);
        let angular = self.angular_acceleration(&input.torque);

        let state = &mut self.state;
        state.velocity_body_frame += linear * dt;
        state.angular_velocity_body_frame += angular * dt;

        state.velocity = body_to_earth_velocity(&state.velocity_body_frame, &cache);
        state.angular_velocity =
            body_to_earth_angular_rate(&state.angular_velocity_body_frame, &cache);

        apply_collision(
            state,
            &cache,
            &self.config.half_extents,
            input.collision.as_ref(),
        );
        integrate_pose(state, dt);
        apply_ground_contact(state);

        state.total_time_sec += dt;
    }

    fn sync_frames(&mut self) {
        let cache = KinematicsCache::new(&self.state.angle);
        self.state.velocity = body_to_earth_velocity(&self.state.velocity_body_frame, &cache);
        self.state.angular_velocity =
            body_to_earth_angular_rate(&self.state.angular_velocity_body_frame, &cache);
    }

    fn state(&self) -> &DroneState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DroneState {
        &mut self.state
    }

    fn config(&self) -> &DynamicsConfig {
        &self.config
    }
}

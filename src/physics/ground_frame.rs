// src/physics/ground_frame.rs

//! # Ground-Frame Dynamics
//!
//! Simplified dynamics integrated directly in the earth frame: the
//! body-frame thrust is rotated into the earth frame, gravity acts along +z,
//! and torque drives the Euler rates without gyroscopic coupling. Body-frame
//! velocities are derived from the earth-frame ones.

use log::debug;
use nalgebra::Vector3;

use super::{
    apply_collision, apply_ground_contact, body_to_earth, earth_to_body_angular_rate,
    earth_to_body_velocity, integrate_pose, DroneState, DynamicsConfig, DynamicsInput,
    KinematicsCache, RigidBodyDynamics,
};
use crate::Error;

/// Rigid-body dynamics integrated in the earth frame.
#[derive(Debug, Clone)]
pub struct GroundFrameDynamics {
    config: DynamicsConfig,
    state: DroneState,
}

impl GroundFrameDynamics {
    /// Creates the dynamics at rest at the origin.
    pub fn new(config: DynamicsConfig) -> Result<Self, Error> {
        config.validate()?;
        debug!("ground-frame dynamics: {:?}", config);
        Ok(GroundFrameDynamics {
            config,
            state: DroneState::default(),
        })
    }
}

impl RigidBodyDynamics for GroundFrameDynamics {
    fn run(&mut self, input: &DynamicsInput) {
        let DynamicsConfig {
            delta_time_sec: dt,
            mass,
            drag,
            gravity,
            ..
        } = self.config;
        let cache = KinematicsCache::new(&self.state.angle);
        let state = &mut self.state;

        let acceleration = body_to_earth(&input.thrust, &cache) / mass
            + Vector3::new(0.0, 0.0, gravity)
            - state.velocity * (drag / mass);
        let angular_acceleration = input
            .torque
            .component_div(&self.config.torque_constants);

        state.velocity += acceleration * dt;
        state.angular_velocity += angular_acceleration * dt;

        state.velocity_body_frame = earth_to_body_velocity(&state.velocity, &cache);
        state.angular_velocity_body_frame =
            earth_to_body_angular_rate(&state.angular_velocity, &cache);

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
        self.state.velocity_body_frame = earth_to_body_velocity(&self.state.velocity, &cache);
        self.state.angular_velocity_body_frame =
            earth_to_body_angular_rate(&self.state.angular_velocity, &cache);
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

// src/controller.rs

//! # Aircraft Controller
//!
//! The interface between a flight controller and the simulation loop, and
//! `AttitudeController`, which wraps the cascaded PID with a collective
//! thrust pass-through and per-axis torque gains.
//!
//! Setpoints follow radio-stick conventions: roll and pitch are signed
//! fractions of the maximum tilt, yaw is an absolute rate, and thrust is a
//! collective force in newtons acting upward (toward earth `-z`).

use log::{debug, warn};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::physics::{Angle, AngularVelocityBodyFrame, Thrust, Torque};
use crate::{CascadedPidController, Error, FlightStabilizer, Number};

/// Pilot or autopilot command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlSetpoint {
    /// Roll as a fraction of the maximum tilt, `-1.0..=1.0`.
    pub roll: f64,
    /// Pitch as a fraction of the maximum tilt, `-1.0..=1.0`.
    pub pitch: f64,
    /// Yaw rate in rad/s.
    pub yaw_rate: f64,
    /// Collective thrust in newtons.
    pub thrust: f64,
}

/// Command plus measurements for one controller call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInput {
    /// Command.
    pub setpoint: ControlSetpoint,
    /// Measured Euler angle.
    pub attitude: Angle,
    /// Measured body-frame angular velocity.
    pub body_rate: AngularVelocityBodyFrame,
}

/// Actuator command in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    /// Body-frame force.
    pub thrust: Thrust,
    /// Body-frame moment.
    pub torque: Torque,
}

impl Default for ControlOutput {
    fn default() -> Self {
        ControlOutput {
            thrust: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }
}

/// A flight controller driven once per simulation tick.
pub trait AircraftController {
    /// Clears all internal state.
    fn reset(&mut self);

    /// Computes the actuator command for one tick.
    fn run(&mut self, input: &ControlInput) -> ControlOutput;

    /// The tick the controller expects between calls to `run`, in seconds.
    fn delta_time_sec(&self) -> f64;
}

impl<C: AircraftController + ?Sized> AircraftController for Box<C> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn run(&mut self, input: &ControlInput) -> ControlOutput {
        (**self).run(input)
    }

    fn delta_time_sec(&self) -> f64 {
        (**self).delta_time_sec()
    }
}

/// Actuator scaling of the attitude controller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttitudeControllerConfig {
    /// Per-axis gain from rate stage output to torque.
    pub torque_gain: Vector3<f64>,
    /// Upper bound on the collective thrust.
    pub max_thrust: f64,
}

impl AttitudeControllerConfig {
    /// Unit torque gains and the given thrust bound.
    pub fn new(max_thrust: f64) -> Self {
        AttitudeControllerConfig {
            torque_gain: Vector3::new(1.0, 1.0, 1.0),
            max_thrust,
        }
    }

    /// Rejects a negative thrust bound.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.max_thrust >= 0.0) {
            warn!("rejected attitude controller configuration: {:?}", self);
            return Err(Error::InvalidConfig("max_thrust must not be negative"));
        }
        Ok(())
    }
}

impl Default for AttitudeControllerConfig {
    fn default() -> Self {
        Self::new(20.0)
    }
}

/// Cascaded attitude controller with collective thrust pass-through.
pub struct AttitudeController {
    cascade: CascadedPidController,
    config: AttitudeControllerConfig,
}

impl AttitudeController {
    /// Wraps a cascade with actuator scaling.
    pub fn new(
        cascade: CascadedPidController,
        config: AttitudeControllerConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        debug!("attitude controller: {:?}", config);
        Ok(AttitudeController { cascade, config })
    }

    /// The wrapped cascade.
    pub fn cascade(&self) -> &CascadedPidController {
        &self.cascade
    }

    /// Actuator scaling.
    pub fn config(&self) -> &AttitudeControllerConfig {
        &self.config
    }
}

impl AircraftController for AttitudeController {
    fn reset(&mut self) {
        self.cascade.reset();
    }

    fn run(&mut self, input: &ControlInput) -> ControlOutput {
        let setpoint = &input.setpoint;
        let (p, q, r) = self.cascade.control(
            (
                setpoint.roll.saturate(-1.0, 1.0),
                setpoint.pitch.saturate(-1.0, 1.0),
                setpoint.yaw_rate,
            ),
            (input.attitude.x, input.attitude.y, input.attitude.z),
            (input.body_rate.x, input.body_rate.y, input.body_rate.z),
        );
        let thrust = setpoint.thrust.saturate(0.0, self.config.max_thrust);

        ControlOutput {
            thrust: Vector3::new(0.0, 0.0, -thrust),
            torque: Vector3::new(p, q, r).component_mul(&self.config.torque_gain),
        }
    }

    fn delta_time_sec(&self) -> f64 {
        self.cascade.config().delta_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::{CascadeConfig, FlightStabilizerConfig, MAX_ANGLE_DEGREES};

    fn controller(torque_gain: Vector3<f64>) -> AttitudeController {
        let mut stage = FlightStabilizerConfig::new();
        stage.output_limit = 100.0;
        let mut cascade = CascadeConfig::new(0.5);
        cascade.max_rotor_rpm = Vector3::repeat(1000.0);
        cascade.max_angle_rate = Vector3::repeat(1000.0);
        let cascade = CascadedPidController::with_config(stage, stage, cascade).unwrap();
        AttitudeController::new(
            cascade,
            AttitudeControllerConfig {
                torque_gain,
                max_thrust: 10.0,
            },
        )
        .unwrap()
    }

    fn input(setpoint: ControlSetpoint) -> ControlInput {
        ControlInput {
            setpoint,
            attitude: Vector3::zeros(),
            body_rate: Vector3::zeros(),
        }
    }

    /// Test that thrust passes through as an upward body force, clamped.
    #[test]
    fn test_thrust_pass_through() {
        let mut controller = controller(Vector3::repeat(1.0));
        let out = controller.run(&input(ControlSetpoint {
            thrust: 4.0,
            ..Default::default()
        }));
        assert!(vector_close(Vector3::new(0.0, 0.0, -4.0), out.thrust));

        let out = controller.run(&input(ControlSetpoint {
            thrust: 50.0,
            ..Default::default()
        }));
        assert!(vector_close(Vector3::new(0.0, 0.0, -10.0), out.thrust));

        let out = controller.run(&input(ControlSetpoint {
            thrust: -1.0,
            ..Default::default()
        }));
        assert!(vector_close(Vector3::zeros(), out.thrust));
    }

    /// Test the rate output is scaled by the torque gains and the roll
    /// fraction is clamped to full tilt.
    #[test]
    fn test_torque_gain_and_setpoint_clamp() {
        let mut controller = controller(Vector3::new(2.0, 1.0, 0.5));
        let setpoint = ControlSetpoint {
            roll: 3.0,
            pitch: 0.0,
            yaw_rate: 0.4,
            thrust: 0.0,
        };
        let _ = controller.run(&input(setpoint));
        let out = controller.run(&input(setpoint));

        let roll_rate = MAX_ANGLE_DEGREES.to_radians();
        assert!(value_close(2.0 * roll_rate, out.torque.x));
        assert!(value_close(0.0, out.torque.y));
        assert!(value_close(0.5 * 0.4, out.torque.z));
    }

    /// Test reset drops the held rate output.
    #[test]
    fn test_reset() {
        let mut controller = controller(Vector3::repeat(1.0));
        let setpoint = ControlSetpoint {
            yaw_rate: 1.0,
            ..Default::default()
        };
        let _ = controller.run(&input(setpoint));
        let out = controller.run(&input(setpoint));
        assert!(value_not_close(0.0, out.torque.z));

        controller.reset();
        let out = controller.run(&input(setpoint));
        assert!(vector_close(Vector3::zeros(), out.torque));
    }

    /// Test the controller reports the cascade tick, also when boxed.
    #[test]
    fn test_delta_time_sec() {
        let controller = controller(Vector3::repeat(1.0));
        assert!(value_close(0.5, controller.delta_time_sec()));

        let boxed: Box<dyn AircraftController> = Box::new(controller);
        assert!(value_close(0.5, boxed.delta_time_sec()));
    }

    /// Test a negative thrust bound is rejected.
    #[test]
    fn test_invalid_config() {
        let cascade = CascadedPidController::with_config(
            FlightStabilizerConfig::new(),
            FlightStabilizerConfig::new(),
            CascadeConfig::default(),
        )
        .unwrap();
        let result = AttitudeController::new(cascade, AttitudeControllerConfig::new(-1.0));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}

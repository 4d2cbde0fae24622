// src/session.rs

//! # Simulation Session
//!
//! Owns one dynamics model, one flight controller and a shared PDU store,
//! and advances them in lockstep. Each step reads the command slots, runs
//! the controller and the dynamics, then publishes the new state, the
//! actuator command and the simulation time.
//!
//! External consumers hold a clone of the store handle and talk to the
//! session only through its slots.

use std::sync::Arc;

use log::{debug, info};

use crate::controller::{AircraftController, ControlInput, ControlOutput};
use crate::noise::SensorNoise;
use crate::pdu::{PduRecord, PduStore, SlotId};
use crate::physics::{DynamicsInput, RigidBodyDynamics};
use crate::Error;

const USEC_PER_SEC: f64 = 1_000_000.0;

/// A running simulation of one vehicle.
pub struct SimulationSession<D: RigidBodyDynamics, C: AircraftController> {
    dynamics: D,
    controller: C,
    store: Arc<PduStore>,
    noise: Option<SensorNoise>,
    started: bool,
    delta_time_usec: u64,
    simulation_time_usec: u64,
}

impl<D: RigidBodyDynamics, C: AircraftController> SimulationSession<D, C> {
    /// A stopped session with a fresh store.
    pub fn new(dynamics: D, controller: C) -> Self {
        Self::with_store(dynamics, controller, Arc::new(PduStore::new()))
    }

    /// A stopped session publishing into an existing store.
    pub fn with_store(dynamics: D, controller: C, store: Arc<PduStore>) -> Self {
        SimulationSession {
            dynamics,
            controller,
            store,
            noise: None,
            started: false,
            delta_time_usec: 0,
            simulation_time_usec: 0,
        }
    }

    /// Adds noise to the attitude and body rate fed to the controller.
    pub fn with_sensor_noise(mut self, noise: SensorNoise) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Starts the session with a tick of `delta_time_usec`, which must match
    /// both the dynamics tick and the controller tick. The simulation clock
    /// restarts at zero.
    pub fn start(&mut self, delta_time_usec: u64) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        if delta_time_usec == 0 {
            return Err(Error::InvalidConfig("delta_time_usec must be positive"));
        }
        let tick = delta_time_usec as f64 / USEC_PER_SEC;
        if (tick - self.dynamics.delta_time_sec()).abs() > 1e-9 {
            return Err(Error::InvalidConfig(
                "delta_time_usec does not match the dynamics tick",
            ));
        }
        if (tick - self.controller.delta_time_sec()).abs() > 1e-9 {
            return Err(Error::InvalidConfig(
                "delta_time_usec does not match the controller tick",
            ));
        }

        self.delta_time_usec = delta_time_usec;
        self.simulation_time_usec = 0;
        self.started = true;
        self.publish(&ControlOutput::default());
        info!("simulation started, tick {} usec", delta_time_usec);
        Ok(())
    }

    /// Stops the session. Slots keep their last values.
    pub fn stop(&mut self) {
        self.started = false;
        info!("simulation stopped at {} usec", self.simulation_time_usec);
    }

    /// Returns controller, dynamics, store and clock to their initial state.
    /// The started flag is left as is.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.dynamics.reset();
        self.store.reset();
        self.simulation_time_usec = 0;
        info!("simulation reset");
    }

    /// Whether the session accepts steps.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Simulation time in microseconds.
    pub fn simulation_time_usec(&self) -> u64 {
        self.simulation_time_usec
    }

    /// Tick in microseconds, zero before the first start.
    pub fn delta_time_usec(&self) -> u64 {
        self.delta_time_usec
    }

    /// Handle to the shared store.
    pub fn store(&self) -> Arc<PduStore> {
        Arc::clone(&self.store)
    }

    /// The dynamics model.
    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    /// The dynamics model, for initial conditions.
    pub fn dynamics_mut(&mut self) -> &mut D {
        &mut self.dynamics
    }

    /// The flight controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Advances controller and dynamics by one tick and publishes the result.
    pub fn advance_time_step(&mut self) -> Result<(), Error> {
        if !self.started {
            return Err(Error::NotStarted);
        }

        let setpoint = self
            .store
            .peek(SlotId::ControlSetpoint)
            .as_setpoint()
            .unwrap_or_default();
        let collision = self
            .store
            .take(SlotId::Collision)
            .and_then(|record| record.as_collision());

        let mut attitude = self.dynamics.angle();
        let mut body_rate = self.dynamics.angular_velocity_body_frame();
        if let Some(noise) = self.noise.as_mut() {
            attitude = noise.add_noise_vector(&attitude);
            body_rate = noise.add_noise_vector(&body_rate);
        }

        let output = self.controller.run(&ControlInput {
            setpoint,
            attitude,
            body_rate,
        });
        let mut input = DynamicsInput::new(output.thrust, output.torque);
        if let Some(collision) = collision {
            debug!("collision consumed at {} usec", self.simulation_time_usec);
            input = input.with_collision(collision);
        }
        self.dynamics.run(&input);
        self.simulation_time_usec += self.delta_time_usec;

        self.publish(&output);
        Ok(())
    }

    fn publish(&self, output: &ControlOutput) {
        let state = self.dynamics.state();
        let vectors = [
            (SlotId::Position, state.position),
            (SlotId::Velocity, state.velocity),
            (SlotId::VelocityBodyFrame, state.velocity_body_frame),
            (SlotId::Angle, state.angle),
            (SlotId::AngularVelocity, state.angular_velocity),
            (
                SlotId::AngularVelocityBodyFrame,
                state.angular_velocity_body_frame,
            ),
        ];
        for (id, value) in vectors {
            self.store.write(id, PduRecord::Vector(value));
        }
        self.store.write(SlotId::Actuator, PduRecord::Actuator(*output));
        self.store.write(
            SlotId::SimulationTime,
            PduRecord::Time {
                usec: self.simulation_time_usec,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{AttitudeController, AttitudeControllerConfig, ControlSetpoint};
    use crate::physics::{BodyFrameDynamics, CollisionInput, DynamicsConfig, GroundFrameDynamics};
    use crate::test_utils::*;
    use crate::{CascadeConfig, CascadedPidController, FlightStabilizerConfig};
    use nalgebra::Vector3;
    use std::thread;

    const TICK_USEC: u64 = 1_000;

    fn controller() -> AttitudeController {
        controller_with_tick(0.001)
    }

    fn controller_with_tick(delta_time: f64) -> AttitudeController {
        let cascade = CascadedPidController::with_config(
            FlightStabilizerConfig::new(),
            FlightStabilizerConfig::new(),
            CascadeConfig::new(delta_time),
        )
        .unwrap();
        AttitudeController::new(cascade, AttitudeControllerConfig::new(30.0)).unwrap()
    }

    fn session() -> SimulationSession<BodyFrameDynamics, AttitudeController> {
        let dynamics = BodyFrameDynamics::new(DynamicsConfig::new(0.001)).unwrap();
        SimulationSession::new(dynamics, controller())
    }

    /// Test the start and stop lifecycle.
    #[test]
    fn test_lifecycle() {
        let mut session = session();
        assert!(matches!(session.advance_time_step(), Err(Error::NotStarted)));
        assert!(matches!(session.start(0), Err(Error::InvalidConfig(_))));
        assert!(matches!(session.start(2_000), Err(Error::InvalidConfig(_))));

        session.start(TICK_USEC).unwrap();
        assert!(session.is_started());
        assert!(matches!(session.start(TICK_USEC), Err(Error::AlreadyStarted)));

        session.advance_time_step().unwrap();
        assert_eq!(TICK_USEC, session.simulation_time_usec());

        session.stop();
        assert!(!session.is_started());
        assert!(matches!(session.advance_time_step(), Err(Error::NotStarted)));

        session.start(TICK_USEC).unwrap();
        assert_eq!(0, session.simulation_time_usec());
    }

    /// Test a controller running on a different tick than the dynamics is
    /// refused at start.
    #[test]
    fn test_start_rejects_controller_tick_mismatch() {
        let dynamics = BodyFrameDynamics::new(DynamicsConfig::new(0.001)).unwrap();
        let mut session = SimulationSession::new(dynamics, controller_with_tick(0.01));
        assert!(matches!(session.start(TICK_USEC), Err(Error::InvalidConfig(_))));
        assert!(!session.is_started());
        assert!(matches!(session.start(10_000), Err(Error::InvalidConfig(_))));
    }

    /// Test a vehicle on the ground without a command stays put and the
    /// state is published every step.
    #[test]
    fn test_publish_at_rest() {
        let mut session = session();
        let store = session.store();
        session.start(TICK_USEC).unwrap();
        assert_eq!(Some(0), store.read(SlotId::SimulationTime).as_time_usec());

        for _ in 0..100 {
            session.advance_time_step().unwrap();
        }
        assert_eq!(
            Some(100 * TICK_USEC),
            store.read(SlotId::SimulationTime).as_time_usec()
        );
        let position = store.read(SlotId::Position).as_vector().unwrap();
        assert!(vector_close(Vector3::zeros(), position));
        assert!(store.is_dirty(SlotId::Angle));
        assert!(store.is_dirty(SlotId::AngularVelocityBodyFrame));
    }

    /// Test a thrust command written to the store lifts the vehicle.
    #[test]
    fn test_setpoint_from_store() {
        let mut session = session();
        let store = session.store();
        session.start(TICK_USEC).unwrap();
        store.write(
            SlotId::ControlSetpoint,
            PduRecord::Setpoint(ControlSetpoint {
                thrust: 15.0,
                ..Default::default()
            }),
        );

        for _ in 0..500 {
            session.advance_time_step().unwrap();
        }
        let position = store.peek(SlotId::Position).as_vector().unwrap();
        assert!(position.z < 0.0, "Vehicle should climb: {}", position.z);
        let actuator = store.peek(SlotId::Actuator).as_actuator().unwrap();
        assert!(vector_close(Vector3::new(0.0, 0.0, -15.0), actuator.thrust));
        assert!(
            store.is_dirty(SlotId::ControlSetpoint),
            "The setpoint is peeked, not consumed."
        );
    }

    /// Test a pending collision is consumed by the next step only.
    #[test]
    fn test_collision_consumed() {
        let dynamics = GroundFrameDynamics::new(DynamicsConfig::new(0.001)).unwrap();
        let mut session = SimulationSession::new(dynamics, controller());
        let store = session.store();
        session
            .dynamics_mut()
            .set_position(Vector3::new(0.0, 0.0, -10.0));
        session
            .dynamics_mut()
            .set_velocity(Vector3::new(2.0, 0.0, 0.0));
        session.start(TICK_USEC).unwrap();

        store.write(
            SlotId::Collision,
            PduRecord::Collision(CollisionInput::new(Vector3::new(1.0, 0.0, 0.0), 1.0)),
        );
        session.advance_time_step().unwrap();
        assert!(!store.is_dirty(SlotId::Collision));
        assert!(session.dynamics().velocity().x < 0.0, "Vehicle should bounce back.");

        let bounced = session.dynamics().velocity().x;
        session.advance_time_step().unwrap();
        assert!(value_close(bounced, session.dynamics().velocity().x));
    }

    /// Test reset clears the clock, the store and the vehicle state.
    #[test]
    fn test_reset() {
        let mut session = session();
        let store = session.store();
        session.start(TICK_USEC).unwrap();
        session
            .dynamics_mut()
            .set_position(Vector3::new(0.0, 0.0, -5.0));
        for _ in 0..10 {
            session.advance_time_step().unwrap();
        }

        session.reset();
        assert_eq!(0, session.simulation_time_usec());
        assert!(session.is_started());
        assert_eq!(PduRecord::Empty, store.peek(SlotId::Position));
        assert!(vector_close(Vector3::zeros(), session.dynamics().position()));
    }

    /// Test noisy measurements still drive a deterministic session.
    #[test]
    fn test_sensor_noise() {
        let noise = SensorNoise::with_std_dev(0.01, Some(3)).unwrap();
        let mut session = session().with_sensor_noise(noise);
        session.start(TICK_USEC).unwrap();
        for _ in 0..10 {
            session.advance_time_step().unwrap();
        }
        let store = session.store();
        let actuator = store.peek(SlotId::Actuator).as_actuator().unwrap();
        assert!(actuator.torque.iter().all(|t| t.is_finite()));
    }

    /// Test a consumer thread reads consistent records while the session runs.
    #[test]
    fn test_concurrent_consumer() {
        let mut session = session();
        let store = session.store();
        session.start(TICK_USEC).unwrap();

        thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut last = 0;
                for _ in 0..1_000 {
                    if let Some(usec) = store.peek(SlotId::SimulationTime).as_time_usec() {
                        assert!(usec >= last, "Time should not go backwards.");
                        last = usec;
                    }
                }
            });
            for _ in 0..1_000 {
                session.advance_time_step().unwrap();
            }
            reader.join().unwrap();
        });
        assert_eq!(1_000 * TICK_USEC, session.simulation_time_usec());
    }
}

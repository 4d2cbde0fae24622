// demos/hover.rs

//! Climbs to 10 m and holds altitude while rolling slightly, commanding the
//! vehicle only through the shared store the way an external pilot would.

use nalgebra::Vector3;

use free_flight_dynamics::{
    build_dynamics, AttitudeController, AttitudeControllerConfig, AxisGains, CascadeConfig,
    CascadedPidController, ControlSetpoint, DynamicsConfig, DynamicsFrame, Error,
    FlightStabilizerConfig, PduRecord, SimulationSession, SlotId, GRAVITY,
};

const TICK_USEC: u64 = 1_000;
const TARGET_ALTITUDE: f64 = 10.0;

fn stage_config(kp: f64, ki: f64, kd: f64) -> FlightStabilizerConfig<f64> {
    FlightStabilizerConfig::uniform(AxisGains::new(kp, ki, kd), 1.0, 10.0)
}

fn main() -> Result<(), Error> {
    let mut dynamics_config = DynamicsConfig::new(TICK_USEC as f64 / 1_000_000.0);
    dynamics_config.mass = 1.2;
    dynamics_config.drag = 0.05;
    let mass = dynamics_config.mass;
    let dynamics = build_dynamics(DynamicsFrame::BodyFrame, dynamics_config)?;

    let mut cascade_config = CascadeConfig::new(dynamics_config.delta_time_sec);
    cascade_config.angle_cycle = 0.005;
    let cascade = CascadedPidController::with_config(
        stage_config(2.0, 0.1, 0.0),
        stage_config(1.0, 0.0, 0.0),
        cascade_config,
    )?;
    let controller = AttitudeController::new(cascade, AttitudeControllerConfig::new(30.0))?;

    let mut session = SimulationSession::new(dynamics, controller);
    let store = session.store();
    session.start(TICK_USEC)?;

    for step in 0..10_000u32 {
        let position = store
            .peek(SlotId::Position)
            .as_vector()
            .unwrap_or_else(Vector3::zeros);
        let velocity = store
            .peek(SlotId::Velocity)
            .as_vector()
            .unwrap_or_else(Vector3::zeros);
        let altitude = -position.z;
        let climb_rate = -velocity.z;
        let thrust = mass * GRAVITY + 2.0 * (TARGET_ALTITUDE - altitude) - 3.0 * climb_rate;

        store.write(
            SlotId::ControlSetpoint,
            PduRecord::Setpoint(ControlSetpoint {
                roll: 0.1,
                pitch: 0.0,
                yaw_rate: 0.0,
                thrust,
            }),
        );
        session.advance_time_step()?;

        if step % 1_000 == 0 {
            let angle = store
                .peek(SlotId::Angle)
                .as_vector()
                .unwrap_or_else(Vector3::zeros);
            println!(
                "t = {:>5.2} s  altitude = {:>6.3} m  roll = {:>6.3} rad",
                session.simulation_time_usec() as f64 / 1_000_000.0,
                altitude,
                angle.x
            );
        }
    }

    session.stop();
    Ok(())
}

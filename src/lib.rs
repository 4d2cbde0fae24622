// src/lib.rs

//! # Free-Flight Drone Dynamics
//!
//! A fixed-step simulation of a single rigid-body drone for
//! hardware-in-the-loop and software-in-the-loop work:
//!
//! - `physics`: Euler-angle rigid-body dynamics, integrated in the body
//!   frame or the earth frame, with restitution-based collision response
//!   and a ground plane.
//! - `stabilizer` and `pid`: a cascaded angle/rate PID controller whose
//!   stages run on their own cycle timers with zero-order hold.
//! - `controller`: the controller interface driven by the simulation loop.
//! - `pdu`: a table of spin-locked state slots shared with external
//!   consumers.
//! - `session`: the owner that advances controller and dynamics in
//!   lockstep and publishes into the store.
//!
//! ```
//! use free_flight_dynamics::{
//!     AttitudeController, AttitudeControllerConfig, BodyFrameDynamics, CascadeConfig,
//!     CascadedPidController, DynamicsConfig, FlightStabilizerConfig, SimulationSession, SlotId,
//! };
//!
//! let dynamics = BodyFrameDynamics::new(DynamicsConfig::new(0.001))?;
//! let cascade = CascadedPidController::with_config(
//!     FlightStabilizerConfig::new(),
//!     FlightStabilizerConfig::new(),
//!     CascadeConfig::new(0.001),
//! )?;
//! let controller = AttitudeController::new(cascade, AttitudeControllerConfig::default())?;
//!
//! let mut session = SimulationSession::new(dynamics, controller);
//! let store = session.store();
//! session.start(1_000)?;
//! session.advance_time_step()?;
//! assert_eq!(Some(1_000), store.read(SlotId::SimulationTime).as_time_usec());
//! # Ok::<(), free_flight_dynamics::Error>(())
//! ```

#![deny(missing_docs)]

pub mod controller;
pub mod error;
pub mod noise;
pub mod pdu;
pub mod physics;
pub mod pid;
pub mod session;
pub mod stabilizer;

#[doc(inline)]
pub use controller::*;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use noise::SensorNoise;
#[doc(inline)]
pub use pdu::{PduRecord, PduStore, SlotId};
#[doc(inline)]
pub use physics::*;
#[doc(inline)]
pub use session::SimulationSession;
#[doc(inline)]
pub use stabilizer::*;

#[cfg(test)]
mod test_utils;

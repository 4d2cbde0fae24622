// src/error.rs

//! Errors reported by configuration, the state store, and the simulation
//! session. The dynamics and controller math never fail.

use thiserror::Error;

/// Errors that can occur while configuring or driving the simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw slot index does not name a store slot.
    #[error("slot index out of range: {0}")]
    SlotOutOfRange(usize),

    /// A configuration parameter cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The session was started twice.
    #[error("simulation already started")]
    AlreadyStarted,

    /// The session was stepped before it was started.
    #[error("simulation not started")]
    NotStarted,

    /// The sensor noise distribution could not be built.
    #[error("sensor noise: {0}")]
    Noise(#[from] rand_distr::NormalError),
}

// src/stabilizer.rs

//! # Flight Stabilization Module
//!
//! The shared stabilizer interface and the cascaded angle/rate controller
//! built on it.

pub mod cascade;
pub use cascade::*;
pub mod flight_stabilizer;
pub use flight_stabilizer::*;

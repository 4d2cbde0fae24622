// src/pid.rs

//! # PID Control Module
//!
//! This module provides the compute function, control data and per-axis
//! state used by every PID stage of the flight controller.

pub mod axis;
pub use axis::*;

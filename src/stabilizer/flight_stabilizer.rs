// src/stabilizer/flight_stabilizer.rs

//! Shared pieces of every PID stage: the numeric bound on the gain type,
//! per-axis gains, the stage configuration, and the `FlightStabilizer`
//! interface.

use piddiy::Number as PiddiyNumber;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Error;

/// Numeric requirements of the PID primitives.
pub trait Number: PiddiyNumber {
    /// Limits the value to `min..=max`.
    fn saturate(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}

/// Proportional, integral and derivative gains of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisGains<T> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain.
    pub kd: T,
}

impl<T: Number> AxisGains<T> {
    /// Gains from their three terms.
    pub fn new(kp: T, ki: T, kd: T) -> Self {
        AxisGains { kp, ki, kd }
    }

    /// A pure proportional controller.
    pub fn proportional(kp: T) -> Self {
        Self::new(kp, T::zero(), T::zero())
    }

    /// `(kp, ki, kd)`.
    pub fn as_tuple(&self) -> (T, T, T) {
        (self.kp, self.ki, self.kd)
    }
}

/// Gains and limits of one controller stage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightStabilizerConfig<T: Number> {
    /// Roll axis gains.
    pub roll: AxisGains<T>,
    /// Pitch axis gains.
    pub pitch: AxisGains<T>,
    /// Yaw axis gains.
    pub yaw: AxisGains<T>,
    /// Symmetric bound on every integral accumulator of the stage.
    pub i_limit: T,
    /// Symmetric bound on every PID output of the stage.
    pub output_limit: T,
}

impl<T: Number> FlightStabilizerConfig<T> {
    /// Unit proportional gain on every axis with unit limits. Replace with
    /// values tuned for the vehicle.
    ///
    /// ```
    /// use free_flight_dynamics::{AxisGains, FlightStabilizerConfig};
    ///
    /// let mut config = FlightStabilizerConfig::<f64>::new();
    /// config.roll = AxisGains::new(1.0, 0.1, 0.05);
    /// config.pitch = config.roll;
    /// config.i_limit = 10.0;
    /// config.output_limit = 100.0;
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self::uniform(AxisGains::proportional(T::one()), T::one(), T::one())
    }

    /// The same gains on all three axes.
    pub fn uniform(gains: AxisGains<T>, i_limit: T, output_limit: T) -> Self {
        FlightStabilizerConfig {
            roll: gains,
            pitch: gains,
            yaw: gains,
            i_limit,
            output_limit,
        }
    }

    /// Rejects negative limits.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.i_limit >= T::zero()) {
            return Err(Error::InvalidConfig("i_limit must not be negative"));
        }
        if !(self.output_limit >= T::zero()) {
            return Err(Error::InvalidConfig("output_limit must not be negative"));
        }
        Ok(())
    }
}

impl<T: Number> Default for FlightStabilizerConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A roll/pitch/yaw stabilizer driven by setpoints, attitude and body rate.
pub trait FlightStabilizer<T: Number> {
    /// Computes `(roll, pitch, yaw)` control outputs for one tick.
    fn control(
        &mut self,
        set_point: (T, T, T),
        attitude: (T, T, T),
        body_rate: (T, T, T),
    ) -> (T, T, T);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that saturation keeps values inside the range.
    #[test]
    fn test_number_saturate() {
        assert_eq!(5.0_f32, 7.0_f32.saturate(-5.0, 5.0));
        assert_eq!(-5.0_f32, (-7.0_f32).saturate(-5.0, 5.0));
        assert_eq!(1.5_f32, 1.5_f32.saturate(-5.0, 5.0));
    }

    /// Test the neutral defaults of a new configuration.
    #[test]
    fn test_flight_stabilizer_config_new() {
        let config = FlightStabilizerConfig::<f32>::new();
        assert_eq!((1.0, 0.0, 0.0), config.roll.as_tuple());
        assert_eq!(config.roll, config.yaw);
        assert_eq!(config, FlightStabilizerConfig::default());
        assert!(config.validate().is_ok());
    }

    /// Test that negative limits are rejected.
    #[test]
    fn test_flight_stabilizer_config_validate() {
        let mut config = FlightStabilizerConfig::<f64>::new();
        config.output_limit = -0.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
